pub mod render;

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::catalog::types::{StateIndex, StateSites};
use crate::catalog::Catalog;
use crate::places::PlacesClient;

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Back,
    /// 1-based selection as typed; range is checked against the current listing.
    Select(usize),
    /// Anything else, e.g. a state name.
    Text(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.to_lowercase().as_str() {
            "exit" => Command::Exit,
            "back" => Command::Back,
            _ => match trimmed.parse::<usize>() {
                Ok(n) => Command::Select(n),
                Err(_) => Command::Text(trimmed.to_string()),
            },
        }
    }
}

/// Prompt states. Listings travel with the state that displays them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    AwaitStateName,
    ShowingSiteList(StateSites),
    ShowingPlaceDetail(StateSites),
    Done,
}

impl NavState {
    fn prompt(&self) -> Option<&'static str> {
        match self {
            NavState::AwaitStateName => Some(render::STATE_PROMPT),
            NavState::ShowingSiteList(_) | NavState::ShowingPlaceDetail(_) => {
                Some(render::DETAIL_PROMPT)
            }
            NavState::Done => None,
        }
    }
}

/// Interactive drill-down: state name -> site list -> nearby places.
///
/// Malformed input never ends the loop. Upstream failures while loading a state or its
/// places are reported and the operator is returned to the state prompt; only a failure
/// to build the state index is returned to the caller.
pub struct Navigator<'a> {
    catalog: &'a Catalog,
    places: &'a PlacesClient,
    index: Option<StateIndex>,
}

impl<'a> Navigator<'a> {
    pub fn new(catalog: &'a Catalog, places: &'a PlacesClient) -> Self {
        Self {
            catalog,
            places,
            index: None,
        }
    }

    /// Drive the prompt loop until `exit` or end of input.
    ///
    /// Lines are decoded lossily, so bytes that are not UTF-8 reach `step` as an
    /// unrecognised command instead of aborting the session.
    pub async fn run<R: AsyncBufRead + Unpin, W: Write>(
        &mut self,
        mut input: R,
        out: &mut W,
    ) -> Result<()> {
        let mut state = NavState::AwaitStateName;
        let mut buf = Vec::new();

        while let Some(text) = state.prompt() {
            render::prompt(out, text)?;

            buf.clear();
            if input.read_until(b'\n', &mut buf).await? == 0 {
                writeln!(out)?;
                render::goodbye(out)?;
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            state = self.step(state, &line, out).await?;
        }

        info!("navigation finished");
        Ok(())
    }

    /// Apply one line of input to `state`.
    pub async fn step<W: Write>(&mut self, state: NavState, line: &str, out: &mut W) -> Result<NavState> {
        let command = Command::parse(line);
        debug!(?command, "input");

        let next = match (state, command) {
            (NavState::Done, _) => NavState::Done,
            (_, Command::Exit) => {
                render::goodbye(out)?;
                NavState::Done
            }
            (NavState::AwaitStateName, Command::Back) => {
                render::error(out, "Enter proper state name")?;
                NavState::AwaitStateName
            }
            (NavState::AwaitStateName, _) => self.open_state(line, out).await?,
            (NavState::ShowingSiteList(_), Command::Back)
            | (NavState::ShowingPlaceDetail(_), Command::Back) => NavState::AwaitStateName,
            (NavState::ShowingSiteList(state), Command::Select(n))
                if (1..=state.sites.len()).contains(&n) =>
            {
                self.open_site(state, n - 1, out).await?
            }
            (NavState::ShowingSiteList(state), _) => {
                render::error(out, "Invalid input")?;
                NavState::ShowingSiteList(state)
            }
            (NavState::ShowingPlaceDetail(state), _) => {
                render::error(out, "Invalid input")?;
                NavState::ShowingPlaceDetail(state)
            }
        };
        Ok(next)
    }

    async fn state_index(&mut self) -> Result<&StateIndex> {
        if self.index.is_none() {
            self.index = Some(self.catalog.build_state_index().await?);
        }
        Ok(self.index.get_or_insert_with(StateIndex::new))
    }

    async fn open_state<W: Write>(&mut self, name: &str, out: &mut W) -> Result<NavState> {
        let state_url = match Catalog::find_state(self.state_index().await?, name) {
            Some(url) => url.to_string(),
            None => {
                render::error(out, "Enter proper state name")?;
                return Ok(NavState::AwaitStateName);
            }
        };

        match self.catalog.get_sites_for_state(&state_url).await {
            Ok(state) => {
                render::site_listing(out, &state)?;
                Ok(NavState::ShowingSiteList(state))
            }
            Err(e) => {
                render::error(out, &e.to_string())?;
                Ok(NavState::AwaitStateName)
            }
        }
    }

    async fn open_site<W: Write>(&mut self, state: StateSites, idx: usize, out: &mut W) -> Result<NavState> {
        let site = &state.sites[idx];
        match self.places.get_nearby_places(site).await {
            Ok(places) => {
                render::places_listing(out, site, &places)?;
                Ok(NavState::ShowingPlaceDetail(state))
            }
            Err(e) => {
                render::error(out, &e.to_string())?;
                Ok(NavState::AwaitStateName)
            }
        }
    }
}
