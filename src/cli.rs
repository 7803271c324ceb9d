use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a video (or submit a URL) and follow the translation
    #[command(group(ArgGroup::new("input").required(true).args(["file", "url"])))]
    Translate {
        /// Local video file to upload
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Remote video URL
        #[arg(short, long)]
        url: Option<String>,

        /// Original language code
        #[arg(short, long)]
        source: String,

        /// Target language code
        #[arg(short, long)]
        target: String,

        /// Interface language (defaults to ui.language from the config)
        #[arg(long)]
        ui_lang: Option<String>,

        /// Caption track to show in the result (language code or "off")
        #[arg(long, default_value = "off")]
        captions: String,

        /// Save the translated video to this path once the job completes
        #[arg(short, long)]
        download: Option<PathBuf>,
    },

    /// List supported languages in display order
    Languages,

    /// Resolve a localized string key
    Strings {
        /// Dotted key, e.g. translate.uploadButton
        key: String,

        /// Language code (defaults to ui.language from the config)
        #[arg(short, long)]
        lang: Option<String>,
    },

    /// Write the default configuration file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "vidtrans.toml")]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_requires_exactly_one_input() {
        let args = Args::try_parse_from([
            "vidtrans", "translate", "--file", "talk.mp4", "--source", "en", "--target", "mn",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Commands::Translate { file: Some(_), url: None, download: None, .. }
        ));

        assert!(Args::try_parse_from([
            "vidtrans", "translate", "--source", "en", "--target", "mn",
        ])
        .is_err());
        assert!(Args::try_parse_from([
            "vidtrans", "translate", "--file", "a.mp4", "--url", "https://x/a.mp4",
            "--source", "en", "--target", "mn",
        ])
        .is_err());
    }

    #[test]
    fn test_translate_download_target() {
        let args = Args::try_parse_from([
            "vidtrans", "translate", "--url", "https://x/a.mp4", "--source", "en", "--target",
            "mn", "--download", "out/talk_mn.mp4",
        ])
        .unwrap();
        match args.command {
            Commands::Translate { download, .. } => {
                assert_eq!(download, Some(PathBuf::from("out/talk_mn.mp4")));
            }
            _ => panic!("expected translate command"),
        }
    }

    #[test]
    fn test_strings_command() {
        let args = Args::try_parse_from(["vidtrans", "-v", "strings", "nav.home", "--lang", "ja"])
            .unwrap();
        assert!(args.verbose);
        match args.command {
            Commands::Strings { key, lang } => {
                assert_eq!(key, "nav.home");
                assert_eq!(lang.as_deref(), Some("ja"));
            }
            _ => panic!("expected strings command"),
        }
    }
}
