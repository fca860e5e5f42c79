use crate as dali;
use dali::common::address::{Long, Short, LONG_MAX};
use dali::drivers::codec::{self, Response};
use dali::drivers::command_utils::{await_response, issue, query, send};
use dali::drivers::simulator::gear::InitialisationState;
use dali::drivers::simulator::{SimBus, SimFault, SimGear};
use dali::drivers::transport::{BusTiming, DynFuture, Transport};
use dali::error::Error;
use dali::gear::cmd_defs::{self as cmd, opcode};
use dali::utils::address_set::AddressSet;
use dali::utils::commission::{Commissioned, Commissioner, Scope};
use dali::utils::long_address::set_search_addr;
use dali::utils::scan::scan;
use dali::utils::search_window::{SearchWindow, MAX_SEARCH_STEPS};
use futures::executor::block_on;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, VecDeque};
use std::io;
use std::time::{Duration, Instant};

const T: BusTiming = BusTiming::immediate();

fn bus_with(longs: &[Long]) -> SimBus {
    let mut sim = SimBus::new(1);
    for &l in longs {
        sim.add_gear(SimGear::with_random_address(l));
    }
    sim
}

fn compare_count(sim: &SimBus) -> usize {
    sim.frames()
        .iter()
        .filter(|f| f[0] == opcode::COMPARE)
        .count()
}

/// Check that every gear got a unique short address matching the report
fn check_assignment(sim: &SimBus, assigned: &[Commissioned]) {
    let mut seen = AddressSet::new();
    for g in sim.gear() {
        let short = g.short_address.expect("gear without short address");
        assert!(!seen.contains(short), "short address {} used twice", short);
        seen += short;
        assert!(assigned.contains(&Commissioned {
            short,
            long: g.random_address
        }));
    }
    assert_eq!(seen.len(), assigned.len());
}

#[test]
fn compare_and_withdraw() {
    let mut sim = bus_with(&[0x123456, 0x123457]);
    block_on(send(&mut sim, &T, cmd::INITIALISE_ALL())).unwrap();
    block_on(send(&mut sim, &T, cmd::RANDOMISE())).unwrap();
    assert!(sim
        .gear()
        .iter()
        .all(|g| g.initialisation_state == InitialisationState::Enabled));

    block_on(set_search_addr(&mut sim, &T, 0x123456)).unwrap();
    let r = block_on(query(&mut sim, &T, cmd::COMPARE())).unwrap();
    assert_eq!(r, Response::Responded);

    block_on(set_search_addr(&mut sim, &T, 0x123455)).unwrap();
    let r = block_on(query(&mut sim, &T, cmd::COMPARE())).unwrap();
    assert_eq!(r, Response::NoResponse);

    block_on(set_search_addr(&mut sim, &T, 0x123456)).unwrap();
    block_on(send(&mut sim, &T, cmd::WITHDRAW())).unwrap();
    let r = block_on(query(&mut sim, &T, cmd::COMPARE())).unwrap();
    assert_eq!(r, Response::NoResponse);
    assert_eq!(
        sim.gear()[0].initialisation_state,
        InitialisationState::Withdrawn
    );

    block_on(send(&mut sim, &T, cmd::TERMINATE())).unwrap();
    assert!(sim
        .gear()
        .iter()
        .all(|g| g.initialisation_state == InitialisationState::Disabled));
}

#[test]
fn config_commands_need_twice() {
    let mut sim = bus_with(&[0x000010]);
    let init = cmd::INITIALISE_ALL().0;
    block_on(issue(&mut sim, init[0], init[1])).unwrap();
    assert_eq!(
        sim.gear()[0].initialisation_state,
        InitialisationState::Disabled
    );
    block_on(issue(&mut sim, init[0], init[1])).unwrap();
    assert_eq!(
        sim.gear()[0].initialisation_state,
        InitialisationState::Enabled
    );
    // The typed command is always written as two frames
    sim.clear_frames();
    block_on(send(&mut sim, &T, cmd::RANDOMISE())).unwrap();
    assert_eq!(sim.frames(), &[[0xa7, 0x00], [0xa7, 0x00]]);
    assert_eq!(sim.gear()[0].random_address, 0x000010);
}

#[test]
fn write_errors() {
    let mut sim = SimBus::new(1);
    sim.inject_fault(SimFault::WriteError);
    assert!(matches!(
        block_on(issue(&mut sim, 0xff, 0x00)),
        Err(Error::TransportWriteIo(_))
    ));
    sim.inject_fault(SimFault::ShortWrite);
    assert!(matches!(
        block_on(issue(&mut sim, 0xff, 0x00)),
        Err(Error::TransportWrite {
            written: 2,
            expected: codec::FORWARD_FRAME_LEN
        })
    ));
    assert!(block_on(issue(&mut sim, 0xff, 0x00)).is_ok());
}

#[test]
fn read_errors() {
    let mut sim = SimBus::new(1);
    let res = block_on(await_response(&mut sim));
    assert!(matches!(res, Err(Error::TransportReadTimeout)));
    assert!(res.unwrap_err().is_timeout());

    sim.inject_fault(SimFault::ReadError);
    assert!(matches!(
        block_on(await_response(&mut sim)),
        Err(Error::TransportRead(_))
    ));

    // A timeout on a query is a valid answer
    let r = block_on(query(&mut sim, &T, cmd::QUERY_STATUS(Short::new(1)))).unwrap();
    assert_eq!(r, Response::NoResponse);
}

/// Hands out scripted read results
struct Scripted {
    reads: VecDeque<io::Result<Vec<u8>>>,
}

impl Transport for Scripted {
    fn write<'a>(&'a mut self, data: &'a [u8]) -> DynFuture<'a, io::Result<usize>> {
        let n = data.len();
        async move { Ok(n) }.boxed()
    }

    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> DynFuture<'a, io::Result<usize>> {
        let res = match self.reads.pop_front() {
            Some(Ok(data)) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            Some(Err(e)) => Err(e),
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "done")),
        };
        async move { res }.boxed()
    }

    fn close(&mut self) -> DynFuture<'_, io::Result<()>> {
        async { Ok(()) }.boxed()
    }
}

#[test]
fn partial_backward_frame() {
    // Bytes trickle in one at a time
    let mut t = Scripted {
        reads: VecDeque::from(vec![Ok(vec![0xff]), Ok(vec![0xff]), Ok(vec![0xfe])]),
    };
    assert_eq!(block_on(await_response(&mut t)).unwrap(), Response::Responded);

    // Only idle bytes before the window closes
    let mut t = Scripted {
        reads: VecDeque::from(vec![Ok(vec![0xff])]),
    };
    assert_eq!(block_on(await_response(&mut t)).unwrap(), Response::NoResponse);

    let mut t = Scripted {
        reads: VecDeque::from(vec![Ok(vec![0x6a])]),
    };
    assert_eq!(block_on(await_response(&mut t)).unwrap(), Response::Responded);
}

#[test]
fn simultaneous_answers() {
    let mut sim = SimBus::new(1);
    let mut a = SimGear::with_short_address(Short::new(2));
    a.actual_level = 0;
    sim.add_gear(a);
    sim.add_gear(SimGear::with_short_address(Short::new(2)));
    let q = cmd::QUERY_STATUS(Short::new(2)).0;
    block_on(issue(&mut sim, q[0], q[1])).unwrap();
    let mut raw = [0u8; codec::BACKWARD_FRAME_LEN];
    let n = block_on(sim.read(&mut raw)).unwrap();
    assert_eq!(n, raw.len());
    // Different answers collide on the wire, still counts as an answer
    assert_eq!(codec::decode_backward(&raw), None);
    assert_eq!(codec::classify(&raw), Response::Responded);
}

#[test]
fn commission_empty_bus() {
    let mut sim = SimBus::new(1);
    let assigned = block_on(Commissioner::new(T).commission(&mut sim)).unwrap();
    assert!(assigned.is_empty());
    // One full search that never got an answer, then a look at the ceiling
    assert_eq!(compare_count(&sim), MAX_SEARCH_STEPS as usize + 1);
    let frames = sim.frames();
    assert_eq!(frames[frames.len() - 2], [0xa1, 0x00]);
    assert_eq!(frames[frames.len() - 1], [0xff, 0x05]);
}

#[test]
fn commission_sequence_start() {
    let mut sim = SimBus::new(1);
    block_on(Commissioner::new(T).commission(&mut sim)).unwrap();
    assert_eq!(
        &sim.frames()[..7],
        &[
            [0xff, 0x20],
            [0xff, 0x20],
            [0xff, 0x00],
            [0xa5, 0x00],
            [0xa5, 0x00],
            [0xa7, 0x00],
            [0xa7, 0x00]
        ]
    );
    // First candidate is the middle of the address space
    assert_eq!(
        &sim.frames()[7..11],
        &[[0xb1, 0x7f], [0xb3, 0xff], [0xb5, 0xff], [0xa9, 0x00]]
    );
}

#[test]
fn commission_single_lowest() {
    let mut sim = bus_with(&[0x000001]);
    let assigned = block_on(Commissioner::new(T).commission(&mut sim)).unwrap();
    assert_eq!(
        assigned,
        vec![Commissioned {
            short: Short::new(0),
            long: 0x000001
        }]
    );
    assert_eq!(sim.gear()[0].short_address, Some(Short::new(0)));
    // Program sequence: search address, program, withdraw, on, off
    let frames = sim.frames();
    let p = frames
        .iter()
        .position(|f| f[0] == opcode::PROGRAM_SHORT_ADDRESS)
        .unwrap();
    assert_eq!(
        &frames[p - 3..p + 4],
        &[
            [0xb1, 0x00],
            [0xb3, 0x00],
            [0xb5, 0x01],
            [0xb7, 0x01],
            [0xab, 0x00],
            [0x01, 0x05],
            [0x01, 0x00]
        ]
    );
}

#[test]
fn commission_single_zero() {
    let mut sim = bus_with(&[0x000000]);
    let assigned = block_on(Commissioner::new(T).commission(&mut sim)).unwrap();
    assert_eq!(
        assigned,
        vec![Commissioned {
            short: Short::new(0),
            long: 0x000000
        }]
    );
    assert_eq!(sim.gear()[0].short_address, Some(Short::new(0)));
    let programmed = sim
        .frames()
        .iter()
        .filter(|f| f[0] == opcode::PROGRAM_SHORT_ADDRESS)
        .count();
    assert_eq!(programmed, 1);
}

#[test]
fn commission_ceiling_address() {
    let mut sim = bus_with(&[LONG_MAX, 0x000100]);
    let assigned = block_on(Commissioner::new(T).commission(&mut sim)).unwrap();
    assert_eq!(
        assigned,
        vec![
            Commissioned {
                short: Short::new(0),
                long: 0x000100
            },
            Commissioned {
                short: Short::new(1),
                long: LONG_MAX
            }
        ]
    );
    assert_eq!(sim.gear()[0].short_address, Some(Short::new(1)));
}

#[test]
fn commission_boundary_addresses() {
    let mut sim = bus_with(&[LONG_MAX, 0x000001, 0x000000, 0xfffffe]);
    let assigned = block_on(Commissioner::new(T).commission(&mut sim)).unwrap();
    let longs: Vec<Long> = assigned.iter().map(|c| c.long).collect();
    assert_eq!(longs, vec![0x000000, 0x000001, 0xfffffe, LONG_MAX]);
    check_assignment(&sim, &assigned);
    let found = block_on(scan(&mut sim, &T)).unwrap();
    assert_eq!(found.len(), 4);
}

#[test]
fn commission_ascending_order() {
    let mut sim = bus_with(&[0xfffffe, 0x000001]);
    let assigned = block_on(Commissioner::new(T).commission(&mut sim)).unwrap();
    assert_eq!(
        assigned,
        vec![
            Commissioned {
                short: Short::new(0),
                long: 0x000001
            },
            Commissioned {
                short: Short::new(1),
                long: 0xfffffe
            }
        ]
    );
    assert_eq!(sim.gear()[0].short_address, Some(Short::new(1)));
    assert_eq!(sim.gear()[1].short_address, Some(Short::new(0)));
    // Each search converges in at most 24 steps, plus the final empty one
    assert!(compare_count(&sim) <= 3 * MAX_SEARCH_STEPS as usize);
}

#[test]
fn commission_many() {
    let mut rng = StdRng::seed_from_u64(4711);
    for n in [0usize, 1, 2, 7, 33, 64] {
        let mut longs = BTreeSet::new();
        while longs.len() < n {
            longs.insert(rng.gen_range(0..=LONG_MAX));
        }
        let mut sim = SimBus::new(n as u64);
        for &l in longs.iter().rev() {
            sim.add_gear(SimGear::with_random_address(l));
        }
        let assigned = block_on(Commissioner::new(T).commission(&mut sim)).unwrap();
        assert_eq!(assigned.len(), n);
        for (i, (c, l)) in assigned.iter().zip(longs.iter()).enumerate() {
            assert_eq!(c.short, Short::new(i as u8));
            assert_eq!(c.long, *l);
        }
        check_assignment(&sim, &assigned);
    }
}

#[test]
fn commission_random_gear() {
    let mut sim = SimBus::new(99);
    for _ in 0..10 {
        sim.add_gear(SimGear::new());
    }
    let assigned = block_on(Commissioner::new(T).commission(&mut sim)).unwrap();
    assert_eq!(assigned.len(), 10);
    check_assignment(&sim, &assigned);
}

#[test]
fn commission_stops_at_64() {
    let longs: Vec<Long> = (1..=65).map(|i| i * 0x1000).collect();
    let mut sim = bus_with(&longs);
    let assigned = block_on(Commissioner::new(T).commission(&mut sim)).unwrap();
    assert_eq!(assigned.len(), 64);
    assert_eq!(assigned[63].short, Short::new(63));
    let unaddressed: Vec<&SimGear> = sim
        .gear()
        .iter()
        .filter(|g| g.short_address.is_none())
        .collect();
    assert_eq!(unaddressed.len(), 1);
    assert_eq!(unaddressed[0].random_address, 65 * 0x1000);
}

#[test]
fn commission_then_scan() {
    let mut sim = bus_with(&[0x00a000, 0x345678, 0x800000, 0xabcdef]);
    let assigned = block_on(Commissioner::new(T).commission(&mut sim)).unwrap();
    let found = block_on(scan(&mut sim, &T)).unwrap();
    let expected: AddressSet = assigned.iter().map(|c| c.short).collect();
    assert_eq!(found, expected);
    assert_eq!(found.to_vec(), (0..4).map(Short::new).collect::<Vec<_>>());
}

#[test]
fn commission_verified() {
    let mut sim = bus_with(&[0x000100, 0x000200]);
    let commissioner = Commissioner::new(T).verify_short_address(true);
    let assigned = block_on(commissioner.commission(&mut sim)).unwrap();
    assert_eq!(assigned.len(), 2);
    let verifies = sim
        .frames()
        .iter()
        .filter(|f| f[0] == opcode::VERIFY_SHORT_ADDRESS)
        .count();
    assert_eq!(verifies, 2);
}

#[test]
fn commission_read_error() {
    let mut sim = bus_with(&[0x000100]);
    sim.inject_fault(SimFault::ReadError);
    let err = block_on(Commissioner::new(T).commission(&mut sim)).unwrap_err();
    match &err {
        Error::Commissioning {
            assigned,
            window,
            source,
        } => {
            assert_eq!(*assigned, 0);
            assert_eq!(*window, SearchWindow::new());
            assert!(matches!(**source, Error::TransportRead(_)));
        }
        e => panic!("Unexpected error: {}", e),
    }
    assert!(err.is_transport_error());
    // Devices are taken out of addressing mode
    assert_eq!(sim.frames().last(), Some(&[0xa1, 0x00]));
    assert_eq!(
        sim.gear()[0].initialisation_state,
        InitialisationState::Disabled
    );
}

#[test]
fn commission_write_error() {
    let mut sim = bus_with(&[0x000100]);
    sim.inject_fault(SimFault::WriteError);
    let err = block_on(Commissioner::new(T).commission(&mut sim)).unwrap_err();
    assert!(matches!(
        err,
        Error::Commissioning {
            assigned: 0,
            ref source,
            ..
        } if matches!(**source, Error::TransportWriteIo(_))
    ));
}

#[test]
fn resynchronise_after_abort() {
    let mut sim = bus_with(&[0x000100]);
    sim.inject_fault(SimFault::ReadError);
    let commissioner = Commissioner::new(T);
    assert!(block_on(commissioner.commission(&mut sim)).is_err());
    block_on(commissioner.resynchronise(&mut sim, Scope::All)).unwrap();
    assert_eq!(
        sim.gear()[0].initialisation_state,
        InitialisationState::Enabled
    );
    let assigned = block_on(commissioner.commission(&mut sim)).unwrap();
    assert_eq!(assigned.len(), 1);
}

#[test]
fn scan_bound_devices() {
    let mut sim = SimBus::new(1);
    sim.add_gear(SimGear::with_short_address(Short::new(3)));
    sim.add_gear(SimGear::with_short_address(Short::new(7)));
    sim.add_gear(SimGear::new());
    let found = block_on(scan(&mut sim, &T)).unwrap();
    assert_eq!(found.to_vec(), vec![Short::new(3), Short::new(7)]);

    let frames = sim.frames();
    assert_eq!(frames[0], [0xff, 0x00]);
    assert_eq!(frames[frames.len() - 1], [0xff, 0x05]);
    // 64 probes, two flashes per device found
    assert_eq!(frames.len(), 1 + 64 + 2 * 2 + 1);
    let p = frames.iter().position(|f| *f == [0x0f, 0x90]).unwrap();
    assert_eq!(&frames[p + 1..p + 3], &[[0x0f, 0x05], [0x0f, 0x00]]);
}

#[test]
fn scan_survives_read_error() {
    let mut sim = SimBus::new(1);
    sim.add_gear(SimGear::with_short_address(Short::new(0)));
    sim.add_gear(SimGear::with_short_address(Short::new(9)));
    sim.inject_fault(SimFault::ReadError);
    let found = block_on(scan(&mut sim, &T)).unwrap();
    // The first probe lost its answer, the rest of the scan continues
    assert_eq!(found.to_vec(), vec![Short::new(9)]);
}

#[test]
fn scan_write_error() {
    let mut sim = SimBus::new(1);
    sim.inject_fault(SimFault::WriteError);
    assert!(matches!(
        block_on(scan(&mut sim, &T)),
        Err(Error::TransportWriteIo(_))
    ));
}

#[test]
fn extend_keeps_bound() {
    let mut sim = SimBus::new(1);
    sim.add_gear(SimGear::with_short_address(Short::new(0)));
    sim.add_gear(SimGear::with_short_address(Short::new(2)));
    sim.add_gear(SimGear::with_random_address(0x000300));
    sim.add_gear(SimGear::with_random_address(0x000200));
    let occupied = block_on(scan(&mut sim, &T)).unwrap();
    let assigned = block_on(Commissioner::new(T).extend(&mut sim, &occupied)).unwrap();
    assert_eq!(
        assigned,
        vec![
            Commissioned {
                short: Short::new(1),
                long: 0x000200
            },
            Commissioned {
                short: Short::new(3),
                long: 0x000300
            }
        ]
    );
    assert_eq!(sim.gear()[0].short_address, Some(Short::new(0)));
    assert_eq!(sim.gear()[1].short_address, Some(Short::new(2)));
    let found = block_on(scan(&mut sim, &T)).unwrap();
    assert_eq!(found.len(), 4);
}

#[test]
fn extend_full_bus() {
    let mut sim = bus_with(&[0x000100]);
    let occupied: AddressSet = Short::all().collect();
    let assigned = block_on(Commissioner::new(T).extend(&mut sim, &occupied)).unwrap();
    assert!(assigned.is_empty());
    assert_eq!(compare_count(&sim), 0);
}

#[test]
fn close_bus() {
    let mut sim = SimBus::new(1);
    block_on(sim.close()).unwrap();
    assert!(sim.is_closed());
    assert!(matches!(
        block_on(issue(&mut sim, 0xff, 0x00)),
        Err(Error::TransportWriteIo(_))
    ));
}

#[tokio::test]
async fn settle_between_frames() {
    let mut sim = SimBus::new(1);
    let timing = BusTiming {
        settle: Duration::from_millis(1),
    };
    let start = Instant::now();
    scan(&mut sim, &timing).await.unwrap();
    // Broadcast off, 64 probes and broadcast on
    assert!(start.elapsed() >= Duration::from_millis(66));
    assert_eq!(sim.frames().len(), 66);
}
