//! Text layout of prompts and listings.

use std::io::{self, Write};

use crate::catalog::types::{Site, SiteField, StateSites};
use crate::places::NearbyPlace;

const RULE: &str =
    "--------------------------------------------------------------------------------";

pub const STATE_PROMPT: &str = r#"Enter a state name (e.g. Michigan or michigan) or "exit""#;
pub const DETAIL_PROMPT: &str = r#"Choose the number for detail or search "exit" or "back""#;

fn banner(out: &mut impl Write, title: &str) -> io::Result<()> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", RULE)
}

pub fn prompt(out: &mut impl Write, text: &str) -> io::Result<()> {
    writeln!(out, "{}", text)?;
    write!(out, ":")?;
    out.flush()
}

/// Fields whose placeholder value would otherwise pass for page data.
const PLACEHOLDER_FIELDS: [SiteField; 4] = [
    SiteField::City,
    SiteField::Region,
    SiteField::Zipcode,
    SiteField::Phone,
];

/// Trailing marker naming the placeholder fields of a site, empty when none.
fn placeholder_note(site: &Site) -> String {
    let fields: Vec<String> = PLACEHOLDER_FIELDS
        .iter()
        .filter(|f| site.is_defaulted(**f))
        .map(|f| f.to_string())
        .collect();
    if fields.is_empty() {
        String::new()
    } else {
        format!(" [placeholder: {}]", fields.join(", "))
    }
}

/// Numbered listing, 1-based to match the selection protocol.
pub fn site_listing(out: &mut impl Write, state: &StateSites) -> io::Result<()> {
    banner(out, &format!("List of National Sites in {}", state.name))?;
    for (i, site) in state.sites.iter().enumerate() {
        writeln!(out, "[{}] {}{}", i + 1, site.info(), placeholder_note(site))?;
    }
    writeln!(out, "{}", RULE)?;
    writeln!(out)
}

pub fn places_listing(out: &mut impl Write, site: &Site, places: &[NearbyPlace]) -> io::Result<()> {
    banner(out, &format!("Places near {}", site.name))?;
    for place in places {
        writeln!(out, "{}", place.info())?;
    }
    writeln!(out)
}

pub fn error(out: &mut impl Write, message: &str) -> io::Result<()> {
    writeln!(out, "[Error] {}", message)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out)
}

pub fn goodbye(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Bye!")
}
