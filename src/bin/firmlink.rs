//! Command-line driver for the firmlink backend.

use clap::{Parser, Subcommand};
use firmlink::{LinkedImage, LlvmTextModule, NativeModule, Target, TargetKind};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "firmlink", version, about = "Build and symbolize kernels for embedded targets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile LLVM IR files and link them into a shared image.
    Build {
        #[arg(long, default_value = "native")]
        target: TargetKind,
        #[arg(short, long)]
        output: PathBuf,
        /// Strip debug information from the image.
        #[arg(long)]
        strip: bool,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Resolve return addresses in an image to source locations.
    Symbolize {
        #[arg(long, default_value = "native")]
        target: TargetKind,
        #[arg(long)]
        image: PathBuf,
        #[arg(value_parser = parse_address)]
        addresses: Vec<u64>,
    },
    /// Demangle symbol names.
    Demangle {
        #[arg(long, default_value = "native")]
        target: TargetKind,
        names: Vec<String>,
    },
}

fn parse_address(s: &str) -> Result<u64, String> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build {
            target,
            output,
            strip,
            inputs,
        } => {
            let target = Target::new(target);
            let modules = inputs
                .iter()
                .map(LlvmTextModule::from_file)
                .collect::<Result<Vec<_>, _>>()?;
            let modules: Vec<&dyn NativeModule> =
                modules.iter().map(|m| m as &dyn NativeModule).collect();

            let mut image = target.compile_and_link(&modules)?;
            if strip {
                image = target.strip(&image)?;
            }
            fs::write(&output, image.as_bytes())?;
            log::info!("wrote {} ({} bytes)", output.display(), image.len());
        }
        Command::Symbolize {
            target,
            image,
            addresses,
        } => {
            let target = Target::new(target);
            let image = LinkedImage::from(fs::read(&image)?);
            for frame in target.symbolize(&image, &addresses)? {
                println!("{frame}");
            }
        }
        Command::Demangle { target, names } => {
            let target = Target::new(target);
            for name in target.demangle(&names)? {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x1004"), Ok(0x1004));
        assert_eq!(parse_address("DEADBEEF"), Ok(0xdead_beef));
        assert!(parse_address("0xzz").is_err());
    }

    #[test]
    fn test_build_arguments() {
        let cli = Cli::try_parse_from([
            "firmlink", "build", "--target", "or1k", "-o", "kernel.elf", "--strip", "a.ll", "b.ll",
        ])
        .unwrap();
        match cli.command {
            Command::Build {
                target,
                output,
                strip,
                inputs,
            } => {
                assert_eq!(target, TargetKind::Or1k);
                assert_eq!(output, PathBuf::from("kernel.elf"));
                assert!(strip);
                assert_eq!(inputs.len(), 2);
            }
            _ => panic!("expected build"),
        }
    }
}
