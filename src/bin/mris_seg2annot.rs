//!
//! mris_seg2annot -- converts a volume-encoded surface segmentation into a surface annotation
//!
//! Reads the colortable given with --ctab, the segmentation given with --seg (one voxel row per
//! vertex), and the white surface of the subject, then writes an annot file to --o.
//!

use clap::{CommandFactory, Parser};
use log::{debug, info};

use std::process::ExitCode;

use seg2annot::{Seg2AnnotArgs, Seg2AnnotConfig};

fn init_logger(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn dump_options(config: &Seg2AnnotConfig) {
    info!("mris_seg2annot {}", env!("CARGO_PKG_VERSION"));
    if let Ok(cwd) = std::env::current_dir() {
        info!("cwd       {}", cwd.display());
    }
    info!("cmdline   {}", std::env::args().collect::<Vec<String>>().join(" "));
    info!("subject   {}", config.subject);
    info!("hemi      {}", config.hemi);
    info!("surfseg   {}", config.seg.display());
    info!("ctab      {}", config.ctab.display());
    info!("annotfile {}", config.annot.display());
    debug!("SUBJECTS_DIR {}", config.subjects_dir.display());
}

fn main() -> ExitCode {
    if std::env::args_os().len() < 2 {
        let _ = Seg2AnnotArgs::command().print_help();
        return ExitCode::FAILURE;
    }

    let args = Seg2AnnotArgs::parse();
    init_logger(args.debug);

    let config = match args.check_options() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            return ExitCode::FAILURE;
        }
    };
    if args.check_only() {
        return ExitCode::SUCCESS;
    }
    dump_options(&config);

    match seg2annot::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            ExitCode::FAILURE
        }
    }
}
