use crate::quote::{PayloadShape, QuoteSourceSettings, DEFAULT_FALLBACK_QUOTES};
use crate::util::{ThirtyError, ThirtyErrorKind};
use clap::Parser;
use serde::Deserialize;
use std::fs::read_to_string;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;

const DEFAULT_CONFIG: &str = "thirty.toml";

#[derive(Parser, Debug)]
#[command(author = "Trevor Bentley", version, about, long_about = None)]
#[command(help_template = "\
{name} v{version}, by {author-with-newline}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
")]
struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// File holding the challenge start date.  Overrides config TOML.
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,
    /// Directory to write daily sites into.  Overrides config TOML.
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
    /// README to regenerate.  Overrides config TOML.
    #[arg(long, value_name = "FILE")]
    readme: Option<PathBuf>,
    /// Don't stage, commit, or push the generated files.
    #[arg(long)]
    no_git: bool,
    /// Commit the generated files, but don't push them.
    #[arg(long)]
    no_push: bool,
    /// Open browser to the generated page after generation.
    #[arg(long)]
    open: bool,
    /// Don't show any output, except errors and warnings
    #[arg(short, long)]
    quiet: bool,
    /// Increase verbosity of output.  Specify up to 3 times.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn verbosity(cli: &CliArgs) -> usize {
    match cli.quiet {
        true => 0,
        // clap saturates the count at u8::MAX
        false => cli.verbose.saturating_add(1).into(),
    }
}

pub struct ThirtyCli {
    pub path: PathBuf,
    pub dir: PathBuf,
    pub config_required: bool,
    pub state: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub readme: Option<PathBuf>,
    pub no_git: bool,
    pub no_push: bool,
    pub should_open: bool,
}

impl ThirtyCli {
    pub fn new() -> Self {
        let cli = CliArgs::parse();
        crate::util::VERBOSITY.store(verbosity(&cli), Ordering::Relaxed);
        ThirtyCli::from_args(cli)
    }

    fn from_args(cli: CliArgs) -> Self {
        let config_required = cli.config.is_some();
        let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
        let config_dir = match config_path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_owned(),
            _ => PathBuf::from("."),
        };
        let config_path = config_path.canonicalize().unwrap_or(config_path);
        let config_dir = config_dir.canonicalize().unwrap_or(config_dir);
        ThirtyCli {
            path: config_path,
            dir: config_dir,
            config_required,
            state: cli.state,
            output: cli.output,
            readme: cli.readme,
            no_git: cli.no_git,
            no_push: cli.no_push,
            should_open: cli.open,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ThirtySettingsTemplates {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ThirtySettingsOutputs {
    pub path: Option<PathBuf>,
}

impl ThirtySettingsOutputs {
    pub fn path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from("generated_sites"))
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ThirtySettingsGit {
    pub enabled: Option<bool>,
    pub push: Option<bool>,
    pub remote: Option<String>,
    pub branch: Option<String>,
}

impl ThirtySettingsGit {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn push(&self) -> bool {
        self.push.unwrap_or(true)
    }

    pub fn remote(&self) -> &str {
        self.remote.as_deref().unwrap_or("origin")
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ThirtySettings {
    pub challenge_name: Option<String>,
    pub signature: Option<String>,
    pub state_file: Option<PathBuf>,
    pub readme: Option<PathBuf>,
    pub quote_timeout_secs: Option<u64>,
    pub quote_sources: Option<Vec<QuoteSourceSettings>>,
    pub fallback_quotes: Option<Vec<String>>,
    #[serde(rename(deserialize = "thirty_templates"), default)]
    pub templates: ThirtySettingsTemplates,
    #[serde(rename(deserialize = "thirty_outputs"), default)]
    pub outputs: ThirtySettingsOutputs,
    #[serde(rename(deserialize = "thirty_git"), default)]
    pub git: ThirtySettingsGit,
}

impl ThirtySettings {
    pub fn new(cli: &ThirtyCli) -> Result<ThirtySettings, ThirtyError> {
        let mut settings = match read_to_string(&cli.path) {
            Ok(toml) => ThirtySettings::from_toml(&toml)?,
            Err(e) if e.kind() == ErrorKind::NotFound && !cli.config_required => ThirtySettings::default(),
            Err(e) => {
                return Err(ThirtyError::sourced_kind(
                    ThirtyErrorKind::Settings,
                    Some(&format!("unable to read configuration file: {}", cli.path.display())),
                    e,
                ))
            }
        };

        // Command-line overrides are relative to where we were started,
        // so resolve them before moving into the config directory.
        let cwd = std::env::current_dir()?;
        if let Some(state) = &cli.state {
            settings.state_file = Some(cwd.join(state));
        }
        if let Some(output) = &cli.output {
            settings.outputs.path = Some(cwd.join(output));
        }
        if let Some(readme) = &cli.readme {
            settings.readme = Some(cwd.join(readme));
        }
        if cli.no_git {
            settings.git.enabled = Some(false);
        }
        if cli.no_push {
            settings.git.push = Some(false);
        }

        // Settings are valid, so let's move into the directory with the config file
        std::env::set_current_dir(&cli.dir).map_err(|e| {
            ThirtyError::sourced_kind(
                ThirtyErrorKind::Settings,
                Some(&format!("unable to set working directory to: {}", cli.dir.display())),
                e,
            )
        })?;
        Ok(settings)
    }

    pub fn from_toml(toml: &str) -> Result<ThirtySettings, ThirtyError> {
        let settings: ThirtySettings = toml::from_str(toml)?;
        if let Some(sources) = &settings.quote_sources {
            if let Some(bad) = sources.iter().find(|s| s.field.trim().is_empty()) {
                return Err(ThirtyError::kind(
                    ThirtyErrorKind::Settings,
                    Some(&format!("quote source {} has an empty `field`", bad.url)),
                ));
            }
        }
        Ok(settings)
    }

    pub fn challenge_name(&self) -> &str {
        self.challenge_name.as_deref().unwrap_or("30github")
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(|| PathBuf::from("start_date.txt"))
    }

    pub fn readme(&self) -> PathBuf {
        self.readme.clone().unwrap_or_else(|| PathBuf::from("README.md"))
    }

    pub fn template_dir(&self) -> Option<&Path> {
        self.templates.path.as_deref()
    }

    pub fn quote_timeout(&self) -> Duration {
        match self.quote_timeout_secs.unwrap_or(5) {
            0 => Duration::from_secs(5),
            x => Duration::from_secs(x),
        }
    }

    pub fn quote_sources(&self) -> Vec<QuoteSourceSettings> {
        match &self.quote_sources {
            Some(sources) => sources.clone(),
            None => vec![
                QuoteSourceSettings {
                    url: "https://api.quotable.io/random".into(),
                    shape: PayloadShape::Object,
                    field: "content".into(),
                },
                QuoteSourceSettings {
                    url: "https://zenquotes.io/api/random".into(),
                    shape: PayloadShape::Array,
                    field: "q".into(),
                },
            ],
        }
    }

    /// The last link of the quote chain must always have something to
    /// pick from, so an empty configured list means the built-in one.
    pub fn fallback_quotes(&self) -> Vec<String> {
        match &self.fallback_quotes {
            Some(quotes) if quotes.iter().any(|q| !q.trim().is_empty()) => quotes
                .iter()
                .filter(|q| !q.trim().is_empty())
                .cloned()
                .collect(),
            _ => DEFAULT_FALLBACK_QUOTES.iter().map(|q| q.to_string()).collect(),
        }
    }
}
