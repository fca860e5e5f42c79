use crate::common::address::AddressByte;

/// Forward frame contents. `ANSWER` is set for queries that expect a
/// backward frame, `TWICE` for configuration commands that only take
/// effect when received twice in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<const ANSWER: bool, const TWICE: bool>(pub [u8; 2]);

/// Raw opcodes, second byte for device commands and first byte for special
/// commands.
pub mod opcode {
    pub const OFF: u8 = 0x00;
    pub const RECALL_MAX_LEVEL: u8 = 0x05;
    pub const RESET: u8 = 0x20;
    pub const QUERY_STATUS: u8 = 0x90;

    pub const TERMINATE: u8 = 0xa1;
    pub const INITIALISE: u8 = 0xa5;
    pub const RANDOMISE: u8 = 0xa7;
    pub const COMPARE: u8 = 0xa9;
    pub const WITHDRAW: u8 = 0xab;
    pub const SEARCHADDRH: u8 = 0xb1;
    pub const SEARCHADDRM: u8 = 0xb3;
    pub const SEARCHADDRL: u8 = 0xb5;
    pub const PROGRAM_SHORT_ADDRESS: u8 = 0xb7;
    pub const VERIFY_SHORT_ADDRESS: u8 = 0xb9;

    pub const INITIALISE_ALL: u8 = 0x00;
    pub const INITIALISE_NO_ADDR: u8 = 0xff;
}

/// Backward frame value for YES
pub const YES: u8 = 0xff;

macro_rules! cmd_type {
    () => {Command<false,false>};
    (Answer) => {Command<true,false>};
    (Twice) => {Command<false,true>};
}

macro_rules! dev_cmd_def {
    ($sym: ident, $opcode: expr $(,$attr: ident)?) => {
        #[allow(non_snake_case)]
        #[inline(always)]
        pub fn $sym<A>(addr: A) -> cmd_type!($($attr)?)
        where
            A: Into<AddressByte>,
        {
            Command([addr.into().0, $opcode])
        }
    };
}

macro_rules! special_cmd_def {
    ($sym: ident, $byte1: expr, $byte2: expr $(,$attr: ident)?) => {
        #[allow(non_snake_case)]
        #[inline(always)]
        pub const fn $sym() -> cmd_type!($($attr)?) {
            Command([$byte1, $byte2])
        }
    };
}

macro_rules! special_data_cmd_def {
    ($sym: ident, $byte1: expr $(,$attr: ident)?) => {
        #[allow(non_snake_case)]
        #[inline(always)]
        pub const fn $sym(data: u8) ->cmd_type!($($attr)?) {
            Command([$byte1, data])
        }
    };
}

dev_cmd_def!(OFF, opcode::OFF);
// Used as "on" by scan and commissioning
dev_cmd_def!(RECALL_MAX_LEVEL, opcode::RECALL_MAX_LEVEL);
dev_cmd_def!(RESET, opcode::RESET, Twice);
dev_cmd_def!(QUERY_STATUS, opcode::QUERY_STATUS, Answer);

special_cmd_def!(TERMINATE, opcode::TERMINATE, 0x00);
special_cmd_def!(INITIALISE_ALL, opcode::INITIALISE, opcode::INITIALISE_ALL, Twice);
special_cmd_def!(INITIALISE_NO_ADDR, opcode::INITIALISE, opcode::INITIALISE_NO_ADDR, Twice);
special_cmd_def!(RANDOMISE, opcode::RANDOMISE, 0x00, Twice);
special_cmd_def!(COMPARE, opcode::COMPARE, 0x00, Answer);
special_cmd_def!(WITHDRAW, opcode::WITHDRAW, 0x00);

special_data_cmd_def!(SEARCHADDRH, opcode::SEARCHADDRH);
special_data_cmd_def!(SEARCHADDRM, opcode::SEARCHADDRM);
special_data_cmd_def!(SEARCHADDRL, opcode::SEARCHADDRL);

#[allow(non_snake_case)]
#[inline(always)]
pub fn PROGRAM_SHORT_ADDRESS<A>(addr: A) -> Command<false, false>
where
    A: Into<AddressByte>,
{
    Command([opcode::PROGRAM_SHORT_ADDRESS, addr.into().0])
}

#[allow(non_snake_case)]
#[inline(always)]
pub fn VERIFY_SHORT_ADDRESS<A>(addr: A) -> Command<true, false>
where
    A: Into<AddressByte>,
{
    Command([opcode::VERIFY_SHORT_ADDRESS, addr.into().0])
}
