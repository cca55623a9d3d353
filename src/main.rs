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
mod generate;
mod git;
mod progress;
mod quote;
mod settings;
mod template;
mod util;

use generate::ThirtyGenerator;
use settings::{ThirtyCli, ThirtySettings};
use util::{ThirtyError, ThirtyErrorKind};

fn run(cli: &ThirtyCli) -> Result<(), ThirtyError> {
    let settings = ThirtySettings::new(cli)?;
    let generator = ThirtyGenerator::new(settings)?;
    let site = generator.generate()?;
    crate::loud!(
        "Day {} written to {} (README: {}, committed: {})",
        site.day,
        site.dir.display(),
        site.readme.display(),
        site.committed
    );
    if cli.should_open {
        if let Err(e) = open::that(&site.index) {
            crate::error!("Unable to open {}: {}", site.index.display(), e);
        }
    }
    Ok(())
}

fn main() {
    let cli = ThirtyCli::new();
    if let Err(e) = run(&cli) {
        crate::error!("Thirty-Days generation failed: {}", e);
        if e.error_kind() == ThirtyErrorKind::State {
            crate::error!("The start date is never reset automatically; fix or remove the file by hand.");
        }
        std::process::exit(1);
    }
}
