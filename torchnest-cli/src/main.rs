use std::fs;
use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use torchnest::io::export::export_solution;
use torchnest::io::import::import_instance;
use torchnest::solver::{self, DEFAULT_KERF_DELTA, DEFAULT_SIZE_DELTA, SolverConfig};
use torchnest_cli::cli::Cli;
use torchnest_cli::io::{init_logger, read_instance, write_json, write_program};
use torchnest_cli::output::Output;

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logger(args.log_level)?;

    let config = match args.config_file {
        None => {
            warn!("[MAIN] no config file provided, use --config-file to provide a custom config");
            SolverConfig::default()
        }
        Some(config_file) => {
            let file = File::open(config_file)?;
            let reader = BufReader::new(file);
            serde_json::from_reader(reader).context("incorrect config file format")?
        }
    };
    info!("[MAIN] running with {config:?}");

    let input_file_stem = args
        .input_file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context("input file has no usable name")?;

    if !args.solution_folder.exists() {
        fs::create_dir_all(&args.solution_folder).with_context(|| {
            format!(
                "could not create solution folder: {:?}",
                args.solution_folder
            )
        })?;
    }

    let ext_instance = read_instance(args.input_file.as_path())?;
    let (pieces, spec) = import_instance(&ext_instance)?;
    info!(
        "[MAIN] imported {} piece kinds for {}x{} mm {} stock",
        pieces.len(),
        spec.width,
        spec.height,
        spec.material
    );

    let result = solver::optimize(&pieces, &spec, &config);
    let solution = export_solution(&pieces, &result);

    let sensitivity = match args.sensitivity {
        true => Some(solver::sensitivity_analysis(
            &pieces,
            &spec,
            DEFAULT_KERF_DELTA,
            DEFAULT_SIZE_DELTA,
        )),
        false => None,
    };

    let output = Output {
        instance: ext_instance,
        solution,
        config,
        sensitivity,
    };
    let solution_path = args
        .solution_folder
        .join(format!("sol_{input_file_stem}.json"));
    write_json(&output, solution_path.as_path())?;

    for plan in &result.cut_plans {
        let program_path = args
            .solution_folder
            .join(format!("{}_sheet{}.nc", input_file_stem, plan.sheet_index + 1));
        write_program(&plan.program, program_path.as_path())?;
    }

    Ok(())
}
