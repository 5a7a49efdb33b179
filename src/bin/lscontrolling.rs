use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use project_balance_builder::{
    consolidate, read_detail_projects, timed, write_file, write_overview_csv, write_records_csv,
    ControllingConfig, ControllingReport, ReportPlan, SourceSet,
};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "lscontrolling",
    about = "Consolidate the SAP exports of one IKZ into a controlling report."
)]
struct Args {
    /// JSON configuration; defaults are used when the file does not exist
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Directory the report files are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Report one slice per project type found in the data instead of the configured lists
    #[arg(long)]
    auto_pa: bool,

    /// Print the JSON schema of the configuration file and exit
    #[arg(long)]
    print_schema: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.print_schema {
        println!("{}", ControllingConfig::schema_as_json()?);
        return Ok(());
    }

    let config = ControllingConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let ledger = timed("Import and cleanup of the SAP exports", || {
        let sources = SourceSet::load(&config)?;
        consolidate(&sources, &config)
    })?;
    let unit = ledger.unit.clone();

    let slices = timed("Filtering", || ledger.slices())?;
    let plan = timed("Selecting the reported project types", || {
        if args.auto_pa {
            ReportPlan::per_project_type(&slices)
        } else {
            let detail_projects = read_detail_projects(&config.csv_detailplot)?;
            ReportPlan::from_config(&slices, &config, &detail_projects)
        }
    })?;

    let report = timed(&format!("Building the report for IKZ {}", unit), || {
        ControllingReport::build(&ledger, &slices, &plan)
    });

    timed("Writing the report files", || -> Result<()> {
        let report_path = args.output_dir.join(format!("{}_Bericht.txt", unit));
        let text = report.to_text();
        write_file(&report_path, |mut file| {
            file.write_all(text.as_bytes())?;
            Ok(())
        })?;

        let overview_path = args.output_dir.join(format!("{}_Projektansicht.csv", unit));
        write_file(&overview_path, |file| write_overview_csv(file, &report.overview))?;

        if config.prt_raw {
            let raw_path = args
                .output_dir
                .join(format!("{}_Kombi_Budget_Drittmittelkontostand.csv", unit));
            write_file(&raw_path, |file| write_records_csv(file, &ledger.records))?;
        }
        Ok(())
    })?;

    info!("Report for IKZ {} written to {}", unit, args.output_dir.display());
    Ok(())
}
