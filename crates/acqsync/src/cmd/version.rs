use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("acqsync {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: acqsync");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("ACQSYNC_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "default_marker_addr: {}",
        acqsync_transport::default_marker_addr()
    );
    println!(
        "sampling_frequency: {} Hz",
        acqsync_session::SAMPLING_FREQUENCY
    );

    Ok(SUCCESS)
}
