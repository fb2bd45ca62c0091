//! Cosens command-line interface.
//!
//! Optimise dye combinations from TOML job files:
//! ```sh
//! cosens-cli run job.toml
//! cosens-cli validate job.toml
//! cosens-cli reference
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cosens_data::irradiance::ReferenceSpectrum;

#[derive(Parser)]
#[command(name = "cosens-cli")]
#[command(about = "Cosens: dye co-sensitization optimiser")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an optimisation from a TOML job file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load and cross-check the inputs without scoring any candidates.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// Print the embedded reference irradiance table as CSV.
    Reference,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Cosens Dye-Combination Optimiser");
            println!("================================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run(&job)?;

            // Determine output directory
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            // Plot datasets, one CSV per figure (default on)
            if job.output.plot_irradiance {
                runner::write_irradiance_csv(&result, &out_dir.join("irradiance.csv"), &job)?;
            }
            if job.output.plot_score_distribution {
                for (index, winner) in result.winners.iter().enumerate() {
                    let path = out_dir.join(format!("scores_{}.csv", winner.condition));
                    runner::write_scores_csv(&result, index, &path, &job)?;
                }
            }
            if job.output.plot_best_spectrum {
                for winner in &result.winners {
                    let path = out_dir.join(format!("best_{}.csv", winner.condition));
                    runner::write_best_csv(&result, winner, &path)?;
                }
            }

            println!("Optimisation complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            println!("Validating: {}", config.display());
            runner::validate(&job)?;
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
        Commands::Reference => {
            let reference = ReferenceSpectrum::am15g();
            let (min, max) = reference.span();
            println!(
                "# AM1.5 global tilt (ASTM G-173-03), {} samples, {:.0}–{:.0} nm",
                reference.len(),
                min,
                max
            );
            println!("wavelength_nm,irradiance_wm2nm");
            for (wl, irr) in reference
                .wavelengths()
                .iter()
                .zip(reference.irradiance().iter())
            {
                println!("{wl:.1},{irr:.4}");
            }
            Ok(())
        }
    }
}
