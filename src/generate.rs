use crate::{
    always, error,
    git::{commit_and_push, DisabledVcs, GitCheckout, VersionControl},
    loud, louder, loudest, normal,
    progress::{ProgressTracker, StartDateFile, TOTAL_DAYS},
    quote::QuoteResolver,
    settings::ThirtySettings,
    template::{PageContext, SiteRenderer, StyleHues},
    util::{FsContext, ThirtyError, ThirtyErrorKind},
};
use chrono::{DateTime, Local, TimeZone, Utc};
use rand::Rng;
use std::fs::{create_dir_all, write, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Directory name for one day's site.  Same date and day, same name.
pub fn site_dir_name<Tz: TimeZone>(now: &DateTime<Tz>, day: u32) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("site_{}_progress_{}", now.format("%-d-%-m-%Y"), day)
}

pub struct GeneratedSite {
    pub day: u32,
    pub dir: PathBuf,
    pub index: PathBuf,
    pub readme: PathBuf,
    pub committed: bool,
}

pub struct ThirtyGenerator {
    settings: ThirtySettings,
    renderer: SiteRenderer,
    quotes: QuoteResolver,
    vcs: Box<dyn VersionControl>,
}

impl ThirtyGenerator {
    pub fn new(settings: ThirtySettings) -> Result<ThirtyGenerator, ThirtyError> {
        let quotes = QuoteResolver::from_settings(
            settings.quote_sources(),
            settings.fallback_quotes(),
            settings.quote_timeout(),
        );
        louder!(" - {} fallback quotes available", quotes.fallback().len());
        let vcs: Box<dyn VersionControl> = match settings.git.enabled() {
            true => match GitCheckout::discover(".", settings.git.remote(), settings.git.branch.as_deref()) {
                Ok(checkout) => Box::new(checkout),
                Err(e) => {
                    error!("Skipping git commands: not inside a valid git repository ({})", e);
                    Box::new(DisabledVcs)
                }
            },
            false => Box::new(DisabledVcs),
        };
        ThirtyGenerator::with_parts(settings, quotes, vcs)
    }

    pub fn with_parts(
        settings: ThirtySettings,
        quotes: QuoteResolver,
        vcs: Box<dyn VersionControl>,
    ) -> Result<ThirtyGenerator, ThirtyError> {
        let renderer = SiteRenderer::new(settings.template_dir())?;
        Ok(ThirtyGenerator {
            settings,
            renderer,
            quotes,
            vcs,
        })
    }

    fn write_rendered(&self, root: &Path, path: &Path, rendered: &str) -> Result<usize, ThirtyError> {
        // Ensure that the requested output path is actually a child
        // of the output directory, so we never write out of bounds.
        let canonical_root = root
            .canonicalize()
            .fs_context(|| format!("cannot find canonical version of output path: {}", root.display()))?;
        let canonical_dir = path
            .parent()
            .map(|p| p.canonicalize())
            .transpose()
            .fs_context(|| format!("cannot find parent of output file: {}", path.display()))?;
        match canonical_dir {
            Some(dir) if dir.starts_with(&canonical_root) => {}
            _ => {
                return Err(ThirtyError::kind(
                    ThirtyErrorKind::Filesystem,
                    Some(&format!(
                        "output file {} not contained in output path: {}",
                        path.display(),
                        canonical_root.display()
                    )),
                ))
            }
        }

        let mut file =
            File::create(path).fs_context(|| format!("unable to write to output path: {}", path.display()))?;
        file.write_all(rendered.as_bytes())
            .fs_context(|| format!("failed to save rendered file to path: {}", path.display()))?;
        louder!(" - wrote file: {}", path.display());
        Ok(rendered.len())
    }

    pub fn generate(&self) -> Result<GeneratedSite, ThirtyError> {
        self.generate_at(Local::now(), &mut rand::thread_rng())
    }

    pub fn generate_at<Tz: TimeZone, R: Rng + ?Sized>(
        &self,
        now: DateTime<Tz>,
        rng: &mut R,
    ) -> Result<GeneratedSite, ThirtyError>
    where
        Tz::Offset: std::fmt::Display,
    {
        let start_all = Instant::now();
        loudest!("Settings:\n{:#?}", &self.settings);

        let output_root = self.settings.outputs.path();
        create_dir_all(&output_root)
            .fs_context(|| format!("unable to create output directory: {}", output_root.display()))?;

        let tracker = ProgressTracker::new(StartDateFile::new(self.settings.state_file()));
        let day = tracker.progress_day(now.with_timezone(&Utc))?;

        // Reused if today's site was already generated.
        let site_dir = output_root.join(site_dir_name(&now, day));
        create_dir_all(&site_dir)
            .fs_context(|| format!("unable to create site directory: {}", site_dir.display()))?;

        let quote = self.quotes.resolve_with(rng);
        loud!(" - quote: {}", quote);
        let hues = StyleHues::random(rng);
        loud!(" - hues: {} / {}", hues.background_hue, hues.accent_hue);

        let page = PageContext::new(
            self.settings.challenge_name(),
            self.settings.signature.as_deref(),
            day,
            &now,
            &quote,
        );
        let html = self.renderer.render_page(&page)?;
        let css = self.renderer.render_styles(&hues)?;
        let readme_content = self.renderer.render_readme(&page)?;

        let index = site_dir.join("index.html");
        let mut bytes = self.write_rendered(&output_root, &index, &html)?;
        bytes += self.write_rendered(&output_root, &site_dir.join("style.css"), &css)?;

        let readme = self.settings.readme();
        write(&readme, &readme_content).fs_context(|| format!("unable to write README: {}", readme.display()))?;
        normal!("Updated {}", readme.display());

        let summary = format!(
            "Site created in folder {}. Progress: {}/{} days.",
            site_dir.display(),
            day,
            TOTAL_DAYS
        );
        always!("{}", summary);
        loud!("Wrote {} bytes in {:.2}s", bytes, start_all.elapsed().as_secs_f32());

        let committed = commit_and_push(self.vcs.as_ref(), &summary, self.settings.git.push());

        Ok(GeneratedSite {
            day,
            dir: site_dir,
            index,
            readme,
            committed,
        })
    }
}
