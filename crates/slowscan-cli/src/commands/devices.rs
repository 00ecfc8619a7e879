//! Capture device listing command.

use clap::{Args, Subcommand};
use slowscan_io::{default_input_device, list_input_devices};

#[derive(Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    command: Option<DevicesCommand>,
}

#[derive(Subcommand)]
enum DevicesCommand {
    /// List all capture devices
    List,

    /// Show the default capture device
    Info,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    match args.command.unwrap_or(DevicesCommand::List) {
        DevicesCommand::List => {
            let devices = list_input_devices()?;

            if devices.is_empty() {
                println!("No capture devices found.");
                return Ok(());
            }

            println!("Capture Devices");
            println!("===============\n");
            for device in &devices {
                let marker = if device.is_default { " (default)" } else { "" };
                println!(
                    "  [{}] {} ({} Hz, {} ch){}",
                    device.index, device.name, device.default_sample_rate, device.channels, marker
                );
            }
            println!();
            println!("Total: {} device(s)", devices.len());
            println!();
            println!("Tip: Use the device index or a partial name with --device:");
            println!("  slowscan track --device 0");
            println!("  slowscan track --device \"USB\"");
        }

        DevicesCommand::Info => {
            let device = default_input_device()?;

            println!("Default Capture Device");
            println!("======================\n");
            println!("  Name: {}", device.name);
            println!("  Sample Rate: {} Hz", device.default_sample_rate);
            println!("  Channels: {}", device.channels);
        }
    }

    Ok(())
}
