//! Command line options of `mris_seg2annot`, and their validation into a [`Seg2AnnotConfig`].

use clap::Parser;

use std::path::PathBuf;

use crate::error::{Result, Seg2AnnotError};
use crate::fs_surface::subject_surface_path;

/// The surface the annotation is created for.
pub const TARGET_SURFACE: &str = "white";

/// Converts a volume-encoded surface segmentation into a surface annotation.
#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(name = "mris_seg2annot", version)]
pub struct Seg2AnnotArgs {
    /// Volume-encoded surface segmentation, one voxel row per vertex.
    #[arg(long = "seg", value_name = "surfseg")]
    pub seg: Option<PathBuf>,

    #[arg(long = "s", value_name = "subject")]
    pub subject: Option<String>,

    /// Hemisphere, like lh or rh.
    #[arg(long = "h", visible_alias = "hemi", value_name = "hemi")]
    pub hemi: Option<String>,

    /// Colortable in lookup table format.
    #[arg(long = "ctab", value_name = "colortable")]
    pub ctab: Option<PathBuf>,

    /// Output annotation file.
    #[arg(long = "o", value_name = "outparc")]
    pub annot: Option<PathBuf>,

    /// Subjects directory, defaults to the SUBJECTS_DIR environment variable.
    #[arg(long = "sd", env = "SUBJECTS_DIR", value_name = "dir")]
    pub subjects_dir: Option<PathBuf>,

    /// Turn on debugging.
    #[arg(long)]
    pub debug: bool,

    /// Don't run anything, just check options and exit.
    #[arg(long, overrides_with = "nocheckopts")]
    pub checkopts: bool,

    #[arg(long, overrides_with = "checkopts")]
    pub nocheckopts: bool,
}

/// Validated options of a conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct Seg2AnnotConfig {
    pub seg: PathBuf,
    pub subject: String,
    pub hemi: String,
    pub ctab: PathBuf,
    pub annot: PathBuf,
    pub subjects_dir: PathBuf,
}

impl Seg2AnnotArgs {

    /// Check that all required options are given. Does not touch the file system.
    pub fn check_options(&self) -> Result<Seg2AnnotConfig> {
        let subject = self.subject.clone().ok_or(Seg2AnnotError::MissingOption("subject"))?;
        let hemi = self.hemi.clone().ok_or(Seg2AnnotError::MissingOption("hemi"))?;
        let ctab = self.ctab.clone().ok_or(Seg2AnnotError::MissingOption("ctab"))?;
        let annot = self.annot.clone().ok_or(Seg2AnnotError::MissingOption("output"))?;
        let seg = self.seg.clone().ok_or(Seg2AnnotError::MissingOption("surfseg"))?;
        let subjects_dir = self.subjects_dir.clone()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or(Seg2AnnotError::SubjectsDirUnset)?;

        Ok(Seg2AnnotConfig {
            seg,
            subject,
            hemi,
            ctab,
            annot,
            subjects_dir,
        })
    }

    /// Whether to stop after checking the options.
    pub fn check_only(&self) -> bool {
        self.checkopts && !self.nocheckopts
    }
}

impl Seg2AnnotConfig {
    /// The surface the segmentation belongs to: `{SUBJECTS_DIR}/{subject}/surf/{hemi}.white`.
    pub fn surface_path(&self) -> PathBuf {
        subject_surface_path(&self.subjects_dir, &self.subject, &self.hemi, TARGET_SURFACE)
    }
}


#[cfg(test)]
mod test {
    use super::*;

    fn full_args() -> Vec<&'static str> {
        vec!["mris_seg2annot", "--seg", "lh.seg.mgz", "--s", "bert", "--h", "lh",
            "--ctab", "aparc.ctab", "--o", "lh.seg.annot", "--sd", "/data/subjects"]
    }

    #[test]
    fn all_options_are_parsed() {
        let args = Seg2AnnotArgs::try_parse_from(full_args()).unwrap();
        let config = args.check_options().unwrap();

        assert_eq!(PathBuf::from("lh.seg.mgz"), config.seg);
        assert_eq!("bert", config.subject);
        assert_eq!("lh", config.hemi);
        assert_eq!(PathBuf::from("aparc.ctab"), config.ctab);
        assert_eq!(PathBuf::from("lh.seg.annot"), config.annot);
        assert_eq!(PathBuf::from("/data/subjects/bert/surf/lh.white"), config.surface_path());
        assert!(!args.debug);
        assert!(!args.check_only());
    }

    #[test]
    fn hemi_has_a_long_alias() {
        let args = Seg2AnnotArgs::try_parse_from(["mris_seg2annot", "--hemi", "rh"]).unwrap();
        assert_eq!(Some(String::from("rh")), args.hemi);
    }

    #[test]
    fn the_last_checkopts_flag_wins() {
        let args = Seg2AnnotArgs::try_parse_from(["mris_seg2annot", "--checkopts"]).unwrap();
        assert!(args.check_only());
        let args = Seg2AnnotArgs::try_parse_from(["mris_seg2annot", "--checkopts", "--nocheckopts"]).unwrap();
        assert!(!args.check_only());
        let args = Seg2AnnotArgs::try_parse_from(["mris_seg2annot", "--nocheckopts", "--checkopts", "--debug"]).unwrap();
        assert!(args.check_only());
        assert!(args.debug);
    }

    #[test]
    fn each_missing_option_is_reported() {
        let cases = [("--s", "subject"), ("--h", "hemi"), ("--ctab", "ctab"), ("--o", "output"), ("--seg", "surfseg")];
        for (flag, name) in cases.iter() {
            let mut argv = full_args();
            let pos = argv.iter().position(|a| a == flag).unwrap();
            argv.drain(pos..pos + 2);
            let args = Seg2AnnotArgs::try_parse_from(argv).unwrap();
            match args.check_options() {
                Err(Seg2AnnotError::MissingOption(missing)) => assert_eq!(*name, missing),
                other => panic!("expected missing {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn an_unset_subjects_dir_is_reported() {
        let mut args = Seg2AnnotArgs::try_parse_from(full_args()).unwrap();
        args.subjects_dir = None;
        assert!(matches!(args.check_options(), Err(Seg2AnnotError::SubjectsDirUnset)));

        args.subjects_dir = Some(PathBuf::new());
        assert!(matches!(args.check_options(), Err(Seg2AnnotError::SubjectsDirUnset)));
    }

    #[test]
    fn unknown_options_are_a_usage_error() {
        assert!(Seg2AnnotArgs::try_parse_from(["mris_seg2annot", "--surf", "lh.white"]).is_err());
        assert!(Seg2AnnotArgs::try_parse_from(["mris_seg2annot", "--s"]).is_err());
    }
}
