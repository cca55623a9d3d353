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
use crate::util::{ThirtyError, ThirtyErrorKind};
use crate::{error, loud, louder};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_FALLBACK_QUOTES: &[&str] = &[
    "The secret of getting ahead is getting started.",
    "It always seems impossible until it's done.",
    "Small daily improvements are the key to staggering long-term results.",
    "Don't watch the clock; do what it does. Keep going.",
    "Success is the sum of small efforts, repeated day in and day out.",
    "You don't have to be great to start, but you have to start to be great.",
];

/// Where the text lives in a quote service's JSON payload.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PayloadShape {
    /// `{"<field>": "..."}`
    Object,
    /// `[{"<field>": "..."}, ...]`
    Array,
}

impl PayloadShape {
    pub fn extract(&self, payload: &Value, field: &str) -> Option<String> {
        let obj = match self {
            PayloadShape::Object => payload.as_object()?,
            PayloadShape::Array => payload.as_array()?.first()?.as_object()?,
        };
        let text = obj.get(field)?.as_str()?.trim();
        match text.is_empty() {
            true => None,
            false => Some(text.to_string()),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct QuoteSourceSettings {
    pub url: String,
    pub shape: PayloadShape,
    pub field: String,
}

pub trait QuoteSource {
    fn name(&self) -> &str;
    fn fetch(&self) -> Result<String, ThirtyError>;
}

pub struct HttpQuoteSource {
    client: Client,
    settings: QuoteSourceSettings,
}

impl HttpQuoteSource {
    pub fn new(settings: QuoteSourceSettings, timeout: Duration) -> Result<Self, ThirtyError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpQuoteSource { client, settings })
    }
}

impl QuoteSource for HttpQuoteSource {
    fn name(&self) -> &str {
        &self.settings.url
    }

    fn fetch(&self) -> Result<String, ThirtyError> {
        louder!(" - requesting quote from {}", self.settings.url);
        let response = self.client.get(&self.settings.url).send()?.error_for_status()?;
        let payload: Value = serde_json::from_slice(&response.bytes()?)?;
        self.settings
            .shape
            .extract(&payload, &self.settings.field)
            .ok_or_else(|| {
                ThirtyError::kind(
                    ThirtyErrorKind::Network,
                    Some(&format!("invalid response from {}", self.settings.url)),
                )
            })
    }
}

/// Ordered chain of quote sources, ending in a fixed list that cannot fail.
pub struct QuoteResolver {
    sources: Vec<Box<dyn QuoteSource>>,
    fallback: Vec<String>,
}

impl QuoteResolver {
    pub fn new(sources: Vec<Box<dyn QuoteSource>>, fallback: Vec<String>) -> Self {
        let fallback = match fallback.is_empty() {
            true => DEFAULT_FALLBACK_QUOTES.iter().map(|q| q.to_string()).collect(),
            false => fallback,
        };
        QuoteResolver { sources, fallback }
    }

    pub fn from_settings(
        sources: Vec<QuoteSourceSettings>,
        fallback: Vec<String>,
        timeout: Duration,
    ) -> Self {
        let mut chain: Vec<Box<dyn QuoteSource>> = vec![];
        for source in sources {
            let url = source.url.clone();
            match HttpQuoteSource::new(source, timeout) {
                Ok(s) => chain.push(Box::new(s)),
                Err(e) => error!("Skipping quote source {}: {}", url, e),
            }
        }
        QuoteResolver::new(chain, fallback)
    }

    pub fn resolve(&self) -> String {
        self.resolve_with(&mut rand::thread_rng())
    }

    pub fn resolve_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        for source in &self.sources {
            match source.fetch() {
                Ok(quote) => {
                    loud!(" - quote from {}", source.name());
                    return quote;
                }
                Err(e) => error!("Quote source {} failed, trying the next one: {}", source.name(), e),
            }
        }
        error!("All quote sources failed, using a fallback quote.");
        // `new` guarantees the list is non-empty
        self.fallback.choose(rng).cloned().unwrap_or_default()
    }

    pub fn fallback(&self) -> &[String] {
        &self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::settings::ThirtySettings;
    use serde_json::json;
    use std::time::Instant;

    fn http_source(server: &mockito::ServerGuard, path: &str, shape: PayloadShape, field: &str) -> Box<dyn QuoteSource> {
        let settings = QuoteSourceSettings {
            url: format!("{}{}", server.url(), path),
            shape,
            field: field.to_string(),
        };
        Box::new(HttpQuoteSource::new(settings, Duration::from_secs(5)).unwrap())
    }

    fn resolver(server: &mockito::ServerGuard) -> QuoteResolver {
        QuoteResolver::new(
            vec![
                http_source(server, "/random", PayloadShape::Object, "content"),
                http_source(server, "/api/random", PayloadShape::Array, "q"),
            ],
            vec![],
        )
    }

    #[test]
    fn extract_object_and_array_payloads() {
        let obj = json!({"content": "  Be bold.  ", "author": "x"});
        assert_eq!(PayloadShape::Object.extract(&obj, "content").as_deref(), Some("Be bold."));
        assert_eq!(PayloadShape::Array.extract(&obj, "content"), None);

        let arr = json!([{"q": "Be kind.", "a": "y"}, {"q": "second"}]);
        assert_eq!(PayloadShape::Array.extract(&arr, "q").as_deref(), Some("Be kind."));
        assert_eq!(PayloadShape::Object.extract(&arr, "q"), None);
    }

    #[test]
    fn extract_rejects_missing_or_empty_text() {
        assert_eq!(PayloadShape::Object.extract(&json!({"content": ""}), "content"), None);
        assert_eq!(PayloadShape::Object.extract(&json!({"content": 12}), "content"), None);
        assert_eq!(PayloadShape::Object.extract(&json!({}), "content"), None);
        assert_eq!(PayloadShape::Array.extract(&json!([]), "q"), None);
        assert_eq!(PayloadShape::Array.extract(&json!([{"q": "   "}]), "q"), None);
    }

    #[test]
    fn primary_source_wins() {
        let mut server = mockito::Server::new();
        let primary = server
            .mock("GET", "/random")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content": "Primary quote.", "author": "A"}"#)
            .create();
        let secondary = server.mock("GET", "/api/random").expect(0).create();

        assert_eq!(resolver(&server).resolve(), "Primary quote.");
        primary.assert();
        secondary.assert();
    }

    #[test]
    fn secondary_used_when_primary_fails() {
        let mut server = mockito::Server::new();
        let primary = server.mock("GET", "/random").with_status(503).create();
        let secondary = server
            .mock("GET", "/api/random")
            .with_status(200)
            .with_body(r#"[{"q": "Secondary quote.", "a": "B"}]"#)
            .create();

        assert_eq!(resolver(&server).resolve(), "Secondary quote.");
        primary.assert();
        secondary.assert();
    }

    #[test]
    fn malformed_primary_payload_falls_through() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/random")
            .with_status(200)
            .with_body(r#"{"quote": "wrong field"}"#)
            .create();
        server
            .mock("GET", "/api/random")
            .with_status(200)
            .with_body(r#"[{"q": "From backup."}]"#)
            .create();

        assert_eq!(resolver(&server).resolve(), "From backup.");
    }

    #[test]
    fn fallback_used_when_all_sources_fail() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/random").with_status(500).create();
        server.mock("GET", "/api/random").with_status(200).with_body("not json").create();

        let resolver = resolver(&server);
        assert!(resolver.fallback().len() >= 5);
        let quote = resolver.resolve_with(&mut StdRng::seed_from_u64(7));
        assert!(DEFAULT_FALLBACK_QUOTES.contains(&quote.as_str()));
    }

    #[test]
    fn silent_source_times_out_and_falls_through() {
        // accepts connections but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let silent = QuoteSourceSettings {
            url: format!("http://{}/random", listener.local_addr().unwrap()),
            shape: PayloadShape::Object,
            field: "content".into(),
        };
        let timeout = ThirtySettings::from_toml("quote_timeout_secs = 1").unwrap().quote_timeout();
        let resolver = QuoteResolver::from_settings(vec![silent], vec!["Patience.".into()], timeout);

        let started = Instant::now();
        assert_eq!(resolver.resolve(), "Patience.");
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(900), "returned too early: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(3), "timeout not applied: {:?}", elapsed);
        drop(listener);
    }

    #[test]
    fn refused_connection_falls_through_to_next_source() {
        let closed = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let mut server = mockito::Server::new();
        let backup = server
            .mock("GET", "/api/random")
            .with_status(200)
            .with_body(r#"[{"q": "Still here."}]"#)
            .create();

        let refused = QuoteSourceSettings {
            url: format!("http://{}/random", closed),
            shape: PayloadShape::Object,
            field: "content".into(),
        };
        let resolver = QuoteResolver::new(
            vec![
                Box::new(HttpQuoteSource::new(refused, Duration::from_secs(5)).unwrap()),
                http_source(&server, "/api/random", PayloadShape::Array, "q"),
            ],
            vec![],
        );
        assert_eq!(resolver.resolve(), "Still here.");
        backup.assert();
    }

    #[test]
    fn configured_fallback_is_used() {
        let resolver = QuoteResolver::new(vec![], vec!["Only this.".into()]);
        assert_eq!(resolver.resolve(), "Only this.");
    }

    struct Failing;
    impl QuoteSource for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn fetch(&self) -> Result<String, ThirtyError> {
            Err(ThirtyError::kind(ThirtyErrorKind::Network, Some("timed out")))
        }
    }

    #[test]
    fn fallback_picks_are_members_of_the_set() {
        let resolver = QuoteResolver::new(vec![Box::new(Failing), Box::new(Failing)], vec![]);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let quote = resolver.resolve_with(&mut rng);
            assert!(resolver.fallback().contains(&quote));
        }
    }
}
