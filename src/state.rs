use std::collections::{HashMap, VecDeque};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sport {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub region_id: String,
    pub demand_score: f64,
    pub supply_score: f64,
    pub edi: f64,
}

/// Server-sorted (descending EDI) top-N row. Sourced independently from the
/// full metric set, so the two may disagree at the margins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankEntry {
    pub region_id: String,
    pub region_name: String,
    pub demand_score: f64,
    pub supply_score: f64,
    pub edi: f64,
}

/// Region-id lookup for the current sport's metrics. Duplicate region ids are
/// malformed input; the last entry wins.
pub fn build_metric_map(metrics: &[Metric]) -> HashMap<String, Metric> {
    let mut map = HashMap::with_capacity(metrics.len());
    for metric in metrics {
        map.insert(metric.region_id.clone(), metric.clone());
    }
    map
}

#[derive(Debug, Clone, Copy)]
pub struct ActiveDetail<'a> {
    pub region: &'a Region,
    pub metric: &'a Metric,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub sports: Vec<Sport>,
    pub selected_sport: Option<String>,
    pub regions: Vec<Region>,
    pub metrics: Vec<Metric>,
    pub metric_map: HashMap<String, Metric>,
    pub rank_list: Vec<RankEntry>,
    pub active_region_id: Option<String>,
    pub loading: bool,
    pub startup_failed: bool,
    pub notice: Option<String>,
    pub rank_selected: usize,
    pub help_overlay: bool,
    pub data_updated_at: Option<SystemTime>,
    pub logs: VecDeque<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            sports: Vec::new(),
            selected_sport: None,
            regions: Vec::new(),
            metrics: Vec::new(),
            metric_map: HashMap::new(),
            rank_list: Vec::new(),
            active_region_id: None,
            loading: false,
            startup_failed: false,
            notice: None,
            rank_selected: 0,
            help_overlay: false,
            data_updated_at: None,
            logs: VecDeque::with_capacity(200),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Single entry point for picking a region, used identically by the map
    /// and the rank list. No validation: an id with no region or metric just
    /// resolves to no detail downstream.
    pub fn select_region(&mut self, id: impl Into<String>) {
        self.active_region_id = Some(id.into());
        self.sync_rank_cursor();
    }

    pub fn clear_region(&mut self) {
        self.active_region_id = None;
    }

    /// After a sport load, a non-empty rank list always moves the selection
    /// to its top entry. An empty list leaves the current selection alone.
    pub fn default_from_rank(&mut self) {
        if let Some(first) = self.rank_list.first() {
            self.active_region_id = Some(first.region_id.clone());
        }
    }

    pub fn active_detail(&self) -> Option<ActiveDetail<'_>> {
        let id = self.active_region_id.as_deref()?;
        let region = self.regions.iter().find(|r| r.id == id)?;
        let metric = self.metric_map.get(id)?;
        Some(ActiveDetail { region, metric })
    }

    pub fn selected_sport_label(&self) -> Option<&str> {
        let code = self.selected_sport.as_deref()?;
        self.sports
            .iter()
            .find(|s| s.code == code)
            .map(|s| s.label.as_str())
    }

    fn selected_sport_index(&self) -> Option<usize> {
        let code = self.selected_sport.as_deref()?;
        self.sports.iter().position(|s| s.code == code)
    }

    pub fn cycle_sport_next(&mut self) {
        if self.sports.is_empty() {
            return;
        }
        let next = match self.selected_sport_index() {
            Some(idx) => (idx + 1) % self.sports.len(),
            None => 0,
        };
        self.selected_sport = Some(self.sports[next].code.clone());
    }

    pub fn cycle_sport_prev(&mut self) {
        if self.sports.is_empty() {
            return;
        }
        let prev = match self.selected_sport_index() {
            Some(0) | None => self.sports.len() - 1,
            Some(idx) => idx - 1,
        };
        self.selected_sport = Some(self.sports[prev].code.clone());
    }

    pub fn select_rank_next(&mut self) {
        let total = self.rank_list.len();
        if total == 0 {
            self.rank_selected = 0;
            return;
        }
        self.rank_selected = (self.rank_selected + 1) % total;
    }

    pub fn select_rank_prev(&mut self) {
        let total = self.rank_list.len();
        if total == 0 {
            self.rank_selected = 0;
            return;
        }
        if self.rank_selected == 0 {
            self.rank_selected = total - 1;
        } else {
            self.rank_selected -= 1;
        }
    }

    /// Enter on the rank list: pick the region under the cursor.
    pub fn select_rank_current(&mut self) {
        if let Some(entry) = self.rank_list.get(self.rank_selected) {
            let id = entry.region_id.clone();
            self.select_region(id);
        }
    }

    pub fn clamp_rank_selection(&mut self) {
        let total = self.rank_list.len();
        if total == 0 {
            self.rank_selected = 0;
        } else if self.rank_selected >= total {
            self.rank_selected = total - 1;
        }
    }

    // Keep the list cursor on the active region when it appears in the
    // ranking (map clicks land here too).
    fn sync_rank_cursor(&mut self) {
        let Some(id) = self.active_region_id.as_deref() else {
            return;
        };
        if let Some(pos) = self.rank_list.iter().position(|e| e.region_id == id) {
            self.rank_selected = pos;
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetInitial {
        sports: Vec<Sport>,
        regions: Vec<Region>,
    },
    InitialFailed {
        error: String,
    },
    SetSportData {
        sport: String,
        metrics: Vec<Metric>,
        rank: Vec<RankEntry>,
    },
    SportDataFailed {
        sport: String,
        error: String,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    FetchInitial,
    FetchSportData { sport: String, top_n: usize },
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetInitial { sports, regions } => {
            state.push_log(format!(
                "[INFO] Loaded {} sports, {} regions",
                sports.len(),
                regions.len()
            ));
            state.sports = sports;
            state.regions = regions;
            state.startup_failed = false;
            state.loading = false;
            // Auto-select the first sport exactly once; the main loop turns
            // this into the first metrics fetch.
            if state.selected_sport.is_none() {
                if let Some(first) = state.sports.first() {
                    state.selected_sport = Some(first.code.clone());
                }
            }
        }
        Delta::InitialFailed { error } => {
            state.push_log(format!("[WARN] Initial load error: {error}"));
            state.startup_failed = true;
            state.loading = false;
            state.notice = Some("Cannot reach backend. Is the API server running?".to_string());
        }
        Delta::SetSportData {
            sport,
            metrics,
            rank,
        } => {
            // A response for a sport the user has navigated away from must
            // not overwrite newer state, and must not clear the loading flag
            // owned by the in-flight request for the current sport.
            if state.selected_sport.as_deref() != Some(sport.as_str()) {
                state.push_log(format!("[INFO] Discarded stale data for {sport}"));
                return;
            }
            state.push_log(format!(
                "[INFO] Loaded {} metrics, top {} for {sport}",
                metrics.len(),
                rank.len()
            ));
            // Metrics, index and ranking replace together: both-or-neither.
            state.metric_map = build_metric_map(&metrics);
            state.metrics = metrics;
            state.rank_list = rank;
            state.data_updated_at = Some(SystemTime::now());
            state.loading = false;
            state.rank_selected = 0;
            state.default_from_rank();
            state.clamp_rank_selection();
        }
        Delta::SportDataFailed { sport, error } => {
            if state.selected_sport.as_deref() != Some(sport.as_str()) {
                state.push_log(format!("[INFO] Discarded stale error for {sport}"));
                return;
            }
            // Previous collections stay in place: stale but consistent.
            state.push_log(format!("[WARN] Metrics load error for {sport}: {error}"));
            state.loading = false;
            state.notice = Some("Failed to load metrics for the selected sport.".to_string());
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
