/*
 * Copyright 2023 Trevor Bentley
 *
 * Author: Trevor Bentley
 * Contact: gitsy@@trevorbentley.com
 *
 * This file is part of Thirty-Days.
 *
 * Thirty-Days is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Thirty-Days is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Thirty-Days.  If not, see <http://www.gnu.org/licenses/>.
 */
use std::error::Error as StdError;
use std::sync::atomic::AtomicUsize;

pub static VERBOSITY: AtomicUsize = AtomicUsize::new(0);

#[macro_export]
#[allow(unused_macros)]
macro_rules! always {
    () => { println!() };
    ($($arg:tt)*) => {{ println!($($arg)*); }};
}

#[macro_export]
#[allow(unused_macros)]
macro_rules! error {
    () => { eprintln!() };
    ($($arg:tt)*) => {{ eprintln!($($arg)*); }};
}

#[macro_export]
#[allow(unused_macros)]
macro_rules! normal {
    () => { if crate::util::VERBOSITY.load(std::sync::atomic::Ordering::Relaxed) > 0 { println!() } };
    ($($arg:tt)*) => {{ if crate::util::VERBOSITY.load(std::sync::atomic::Ordering::Relaxed) > 0 { println!($($arg)*); } }};
}

#[macro_export]
#[allow(unused_macros)]
macro_rules! loud {
    () => { if crate::util::VERBOSITY.load(std::sync::atomic::Ordering::Relaxed) > 1 { println!() } };
    ($($arg:tt)*) => {{ if crate::util::VERBOSITY.load(std::sync::atomic::Ordering::Relaxed) > 1 { println!($($arg)*); } }};
}

#[macro_export]
#[allow(unused_macros)]
macro_rules! louder {
    () => { if crate::util::VERBOSITY.load(std::sync::atomic::Ordering::Relaxed) > 2 { println!() } };
    ($($arg:tt)*) => {{ if crate::util::VERBOSITY.load(std::sync::atomic::Ordering::Relaxed) > 2 { println!($($arg)*); } }};
}

#[macro_export]
#[allow(unused_macros)]
macro_rules! loudest {
    () => { if crate::util::VERBOSITY.load(std::sync::atomic::Ordering::Relaxed) > 3 { println!() } };
    ($($arg:tt)*) => {{ if crate::util::VERBOSITY.load(std::sync::atomic::Ordering::Relaxed) > 3 { println!($($arg)*); } }};
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThirtyErrorKind {
    #[default]
    Unknown,
    Settings,
    State,
    Network,
    Template,
    Git,
    Filesystem,
}

#[derive(Default)]
pub struct ThirtyError {
    msg: Option<String>,
    kind: ThirtyErrorKind,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ThirtyError {
    pub fn kind(kind: ThirtyErrorKind, msg: Option<&str>) -> Self {
        ThirtyError {
            kind,
            msg: msg.map(|x| x.to_owned()),
            source: None,
        }
    }
    pub fn sourced_kind(
        kind: ThirtyErrorKind,
        msg: Option<&str>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        ThirtyError {
            kind,
            msg: msg.map(|x| x.to_owned()),
            source: Some(Box::new(source)),
        }
    }
    pub fn error_kind(&self) -> ThirtyErrorKind {
        self.kind
    }
}
impl std::fmt::Display for ThirtyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ThirtyErrorKind::Settings => write!(f, "thirty error (settings)")?,
            ThirtyErrorKind::State => write!(f, "thirty error (state)")?,
            ThirtyErrorKind::Network => write!(f, "thirty error (network)")?,
            ThirtyErrorKind::Template => write!(f, "thirty error (template)")?,
            ThirtyErrorKind::Git => write!(f, "thirty error (git)")?,
            ThirtyErrorKind::Filesystem => write!(f, "thirty error (filesystem)")?,
            ThirtyErrorKind::Unknown => write!(f, "thirty error (unknown)")?,
        }
        write!(f, ": {}", self.msg.as_deref().unwrap_or_default())?;
        if let Some(src) = &self.source {
            write!(f, " ({})", src)?;
        }
        Ok(())
    }
}
impl std::fmt::Debug for ThirtyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}
impl StdError for ThirtyError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|c| &**c as &(dyn StdError + 'static))
    }
}
impl From<git2::Error> for ThirtyError {
    fn from(source: git2::Error) -> Self {
        ThirtyError::sourced_kind(ThirtyErrorKind::Git, Some(&source.message().to_owned()), source)
    }
}
impl From<tera::Error> for ThirtyError {
    fn from(source: tera::Error) -> Self {
        // tera hides the useful part of the message in the source chain
        let mut msg = source.to_string();
        let mut cause = source.source();
        while let Some(c) = cause {
            msg.push_str(&format!(": {}", c));
            cause = c.source();
        }
        ThirtyError::kind(ThirtyErrorKind::Template, Some(&msg))
    }
}
impl From<reqwest::Error> for ThirtyError {
    fn from(source: reqwest::Error) -> Self {
        ThirtyError::sourced_kind(ThirtyErrorKind::Network, Some("request failed"), source)
    }
}
impl From<serde_json::Error> for ThirtyError {
    fn from(source: serde_json::Error) -> Self {
        ThirtyError::sourced_kind(ThirtyErrorKind::Network, Some("malformed payload"), source)
    }
}
impl From<std::io::Error> for ThirtyError {
    fn from(source: std::io::Error) -> Self {
        ThirtyError::sourced_kind(ThirtyErrorKind::Filesystem, None, source)
    }
}
impl From<toml::de::Error> for ThirtyError {
    fn from(source: toml::de::Error) -> Self {
        ThirtyError::sourced_kind(ThirtyErrorKind::Settings, Some("configuration file is invalid"), source)
    }
}

/// Attach a message to a fallible filesystem operation.
pub trait FsContext<T> {
    fn fs_context(self, msg: impl FnOnce() -> String) -> Result<T, ThirtyError>;
}

impl<T> FsContext<T> for Result<T, std::io::Error> {
    fn fs_context(self, msg: impl FnOnce() -> String) -> Result<T, ThirtyError> {
        self.map_err(|e| ThirtyError::sourced_kind(ThirtyErrorKind::Filesystem, Some(&msg()), e))
    }
}
