use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use dali::config::MasterConfig;
use dali::drivers::transport::Transport;
use dali::error::Error;
use dali::utils::commission::{Commissioned, Scope};
use dali::utils::scan::scan;

use dali_master as dali;

#[derive(Subcommand, Debug, Copy, Clone)]
enum Action {
    /// List short addresses with a device bound to them
    Scan,
    /// Give every device a new short address
    Commission,
    /// Give devices without a short address a free one
    Extend,
    /// Re-enable all devices for addressing after an aborted pass
    Resynchronise,
}

#[derive(Parser, Debug)]
/// Commission DALI gear through a serial bus interface
struct CmdArgs {
    /// Serial port of the bus interface
    #[arg(short = 'd', long, default_value = "/dev/ttyUSB0")]
    port: String,
    /// JSON file with transport and timing settings
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Delay after each forward frame, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,
    /// Check each programmed short address with VERIFY SHORT ADDRESS
    #[arg(long)]
    verify: bool,
    /// Use a simulated bus with this many unaddressed devices
    #[arg(long)]
    simulate: Option<usize>,
    #[command(subcommand)]
    action: Action,
}

fn print_assigned(assigned: &[Commissioned]) {
    for c in assigned {
        println!("Long: {:06x}, Short: {}", c.long, c.short);
    }
    println!("{} devices commissioned", assigned.len());
}

async fn run(
    action: Action,
    config: &MasterConfig,
    transport: &mut dyn Transport,
) -> Result<(), Error> {
    let commissioner = config.commissioner();
    match action {
        Action::Scan => {
            let found = scan(transport, &config.timing).await?;
            println!("Found {} devices: {}", found.len(), found);
        }
        Action::Commission => {
            let assigned = commissioner.commission(transport).await?;
            print_assigned(&assigned);
        }
        Action::Extend => {
            let occupied = scan(transport, &config.timing).await?;
            let assigned = commissioner.extend(transport, &occupied).await?;
            print_assigned(&assigned);
        }
        Action::Resynchronise => commissioner.resynchronise(transport, Scope::All).await?,
    }
    Ok(())
}

#[cfg(feature = "simulator")]
fn simulated(devices: usize) -> Result<Box<dyn Transport>, Error> {
    use dali::drivers::simulator::{SimBus, SimGear};
    let mut bus = SimBus::new(rand::random());
    for _ in 0..devices {
        bus.add_gear(SimGear::new());
    }
    Ok(Box::new(bus))
}

#[cfg(not(feature = "simulator"))]
fn simulated(_devices: usize) -> Result<Box<dyn Transport>, Error> {
    Err(Error::TransportOpen("built without simulator support".into()))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = CmdArgs::parse();

    let mut config = match &args.config {
        Some(path) => match MasterConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to read configuration {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => MasterConfig::default(),
    };
    if let Some(ms) = args.settle_ms {
        config.timing.settle = Duration::from_millis(ms);
    }
    config.verify_short_address |= args.verify;

    let transport = match args.simulate {
        Some(n) => simulated(n),
        None => dali::drivers::open(&args.port, &config.transport),
    };
    let mut transport = match transport {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to open bus interface: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("{:?} on {}", args.action, args.port);

    let res = run(args.action, &config, transport.as_mut()).await;
    if let Err(e) = transport.close().await {
        warn!("Failed to close bus interface: {}", e);
    }
    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            if let Error::Commissioning { .. } = e {
                error!("Run resynchronise before retrying");
            }
            ExitCode::FAILURE
        }
    }
}
