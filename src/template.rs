use crate::progress::TOTAL_DAYS;
use crate::util::{ThirtyError, ThirtyErrorKind};
use chrono::{DateTime, TimeZone};
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tera::{to_value, Context, Function, Tera, Value};

pub const PAGE_TEMPLATE: &str = "index.html";
pub const STYLE_TEMPLATE: &str = "style.css";
pub const README_TEMPLATE: &str = "README.md";

const BUILTIN_PAGE: &str = "<!DOCTYPE html>
<html lang='en'>
<head>
    <meta charset='UTF-8'>
    <meta name='viewport' content='width=device-width, initial-scale=1.0'>
    <title>Day {{ date }} ({{ day }}/{{ total_days }} days)</title>
    <link rel='stylesheet' href='style.css'>
</head>
<body>
    <div class='container'>
        <h1>Today is {{ date }}</h1>
        <h2>Progress: {{ day }}/{{ total_days }} days</h2>
        <p class='quote'>\"{{ quote }}\"</p>
    </div>
</body>
</html>
";

const BUILTIN_STYLE: &str = "body {
    font-family: Arial, sans-serif;
    background-color: {{ hsl(h=background_hue, s=100, l=90) }};
    display: flex;
    justify-content: center;
    align-items: center;
    min-height: 100vh;
    text-align: center;
    margin: 0;
}
.container {
    background: white;
    padding: 20px;
    border-radius: 10px;
    box-shadow: 0 0 10px rgba(0, 0, 0, 0.1);
}
.quote {
    font-style: italic;
    margin-top: 10px;
    color: {{ hsl(h=accent_hue, s=100, l=30) }};
}
";

const BUILTIN_README: &str = "{% if not complete -%}
# {{ challenge_name }}

<span style=\"font-size: 2rem;\"> 🚀 Started participating in the {{ total_days }} day GitHub challenge! </span>

<span style=\"font-size: 2rem; font-weight: bold; color: green;\"> My progress: {{ day }}/{{ total_days }} </span>
{% else -%}
# {{ challenge_name }} 🎉🎂🎊

<span style=\"font-size: 2rem;\"> 🎉 Congratulations! You have successfully completed the {{ total_days }}-day GitHub challenge! 🎊 </span>

{% if signature -%}
<span style=\"font-size: 2rem; font-weight: bold; color: gold;\"> {{ signature }} from {{ short_date }} is proud of you! 🚀 </span>
{% else -%}
<span style=\"font-size: 2rem; font-weight: bold; color: gold;\"> Finished on {{ short_date }}. 🚀 </span>
{% endif -%}
{% endif -%}
";

/// `hsl(h=.., s=.., l=..)` in templates, producing a CSS color.
pub struct HslFn;
impl Function for HslFn {
    fn call(&self, args: &HashMap<String, Value>) -> Result<Value, tera::Error> {
        let arg = |name: &str| -> Result<u64, tera::Error> {
            match args.get(name).map(|v| tera::from_value::<u64>(v.clone())) {
                Some(Ok(v)) => Ok(v),
                _ => Err(tera::Error::msg(format!("hsl: missing or invalid `{}` argument", name))),
            }
        };
        let (h, s, l) = (arg("h")?, arg("s")?, arg("l")?);
        Ok(to_value(format!("hsl({}, {}%, {}%)", h % 360, s.min(100), l.min(100)))?)
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// The two hue angles that make each day's page look different.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleHues {
    pub background_hue: u16,
    pub accent_hue: u16,
}

impl StyleHues {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        StyleHues {
            background_hue: rng.gen_range(0..360),
            accent_hue: rng.gen_range(0..360),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct PageContext<'a> {
    pub challenge_name: &'a str,
    pub signature: Option<&'a str>,
    pub day: u32,
    pub total_days: u32,
    pub complete: bool,
    pub date: String,
    pub short_date: String,
    pub quote: &'a str,
}

impl<'a> PageContext<'a> {
    pub fn new<Tz: TimeZone>(
        challenge_name: &'a str,
        signature: Option<&'a str>,
        day: u32,
        now: &DateTime<Tz>,
        quote: &'a str,
    ) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        PageContext {
            challenge_name,
            signature,
            day,
            total_days: TOTAL_DAYS,
            complete: day >= TOTAL_DAYS,
            date: now.format("%-d %B %Y").to_string(),
            short_date: now.format("%-m/%-d/%Y").to_string(),
            quote,
        }
    }
}

pub struct SiteRenderer {
    tera: Tera,
}

impl SiteRenderer {
    /// Built-in templates, optionally overridden by same-named files in
    /// `template_dir`.
    pub fn new(template_dir: Option<&Path>) -> Result<Self, ThirtyError> {
        let mut builtin = Tera::default();
        builtin.add_raw_templates(vec![
            (PAGE_TEMPLATE, BUILTIN_PAGE),
            (STYLE_TEMPLATE, BUILTIN_STYLE),
            (README_TEMPLATE, BUILTIN_README),
        ])?;
        let mut tera = match template_dir {
            Some(dir) => {
                if !dir.is_dir() {
                    return Err(ThirtyError::kind(
                        ThirtyErrorKind::Settings,
                        Some(&format!("template directory not found: {}", dir.display())),
                    ));
                }
                let mut glob = dir.to_path_buf();
                glob.push("**");
                glob.push("*.{html,css,md}");
                let mut custom = Tera::new(&glob.to_string_lossy())?;
                // existing (user) templates win over the built-ins
                custom.extend(&builtin)?;
                custom
            }
            None => builtin,
        };
        tera.register_function("hsl", HslFn {});
        Ok(SiteRenderer { tera })
    }

    pub fn render_page(&self, page: &PageContext) -> Result<String, ThirtyError> {
        Ok(self.tera.render(PAGE_TEMPLATE, &Context::from_serialize(page)?)?)
    }

    pub fn render_styles(&self, hues: &StyleHues) -> Result<String, ThirtyError> {
        Ok(self.tera.render(STYLE_TEMPLATE, &Context::from_serialize(hues)?)?)
    }

    pub fn render_readme(&self, page: &PageContext) -> Result<String, ThirtyError> {
        Ok(self.tera.render(README_TEMPLATE, &Context::from_serialize(page)?)?)
    }
}
