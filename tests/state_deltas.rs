use spomap_terminal::state::{
    apply_delta, AppState, Delta, Metric, RankEntry, Region, Sport,
};

fn sport(code: &str, label: &str) -> Sport {
    Sport {
        code: code.to_string(),
        label: label.to_string(),
    }
}

fn region(id: &str, name: &str) -> Region {
    Region {
        id: id.to_string(),
        name: name.to_string(),
        lat: 36.0,
        lng: 127.0,
    }
}

fn metric(region_id: &str, demand: f64, supply: f64) -> Metric {
    Metric {
        region_id: region_id.to_string(),
        demand_score: demand,
        supply_score: supply,
        edi: demand - supply,
    }
}

fn rank(region_id: &str, name: &str, edi: f64) -> RankEntry {
    RankEntry {
        region_id: region_id.to_string(),
        region_name: name.to_string(),
        demand_score: edi,
        supply_score: 0.0,
        edi,
    }
}

fn initial_delta() -> Delta {
    Delta::SetInitial {
        sports: vec![sport("soccer", "Soccer"), sport("swimming", "Swimming")],
        regions: vec![region("r1", "Seoul"), region("r2", "Busan")],
    }
}

#[test]
fn initial_load_auto_selects_first_sport_once() {
    let mut state = AppState::new();
    state.loading = true;

    apply_delta(&mut state, initial_delta());
    assert_eq!(state.selected_sport.as_deref(), Some("soccer"));
    assert!(!state.loading);
    assert!(!state.startup_failed);

    // A later refresh of the global lists must not fight the user's choice.
    state.selected_sport = Some("swimming".to_string());
    apply_delta(&mut state, initial_delta());
    assert_eq!(state.selected_sport.as_deref(), Some("swimming"));
}

#[test]
fn initial_failure_surfaces_notice_and_clears_loading() {
    let mut state = AppState::new();
    state.loading = true;

    apply_delta(
        &mut state,
        Delta::InitialFailed {
            error: "connection refused".to_string(),
        },
    );
    assert!(!state.loading);
    assert!(state.startup_failed);
    assert!(state.notice.is_some());
    assert!(state.sports.is_empty());
}

#[test]
fn sport_data_replaces_collections_and_default_selects_top_rank() {
    let mut state = AppState::new();
    apply_delta(&mut state, initial_delta());
    state.loading = true;

    apply_delta(
        &mut state,
        Delta::SetSportData {
            sport: "soccer".to_string(),
            metrics: vec![metric("r1", 80.0, 20.0), metric("r2", 30.0, 70.0)],
            rank: vec![rank("r2", "Busan", 44.0)],
        },
    );

    assert!(!state.loading);
    assert_eq!(state.metrics.len(), 2);
    assert_eq!(state.metric_map.len(), 2);
    assert_eq!(state.rank_list.len(), 1);
    // Non-empty rank list always overwrites the active region.
    assert_eq!(state.active_region_id.as_deref(), Some("r2"));
    assert_eq!(state.rank_selected, 0);
    assert!(state.data_updated_at.is_some());
}

#[test]
fn sport_data_overwrites_a_manual_selection() {
    let mut state = AppState::new();
    apply_delta(&mut state, initial_delta());
    state.select_region("r1");

    apply_delta(
        &mut state,
        Delta::SetSportData {
            sport: "soccer".to_string(),
            metrics: vec![metric("r2", 30.0, 10.0)],
            rank: vec![rank("r2", "Busan", 20.0)],
        },
    );
    assert_eq!(state.active_region_id.as_deref(), Some("r2"));
}

#[test]
fn empty_rank_list_leaves_selection_untouched() {
    let mut state = AppState::new();
    apply_delta(&mut state, initial_delta());
    state.select_region("r1");
    state.loading = true;

    apply_delta(
        &mut state,
        Delta::SetSportData {
            sport: "soccer".to_string(),
            metrics: vec![metric("r1", 10.0, 5.0)],
            rank: Vec::new(),
        },
    );
    assert!(!state.loading);
    assert_eq!(state.active_region_id.as_deref(), Some("r1"));
}

#[test]
fn stale_sport_response_is_discarded_and_keeps_loading() {
    let mut state = AppState::new();
    apply_delta(&mut state, initial_delta());

    // Load soccer, then navigate to swimming while its fetch is in flight.
    apply_delta(
        &mut state,
        Delta::SetSportData {
            sport: "soccer".to_string(),
            metrics: vec![metric("r1", 80.0, 20.0)],
            rank: vec![rank("r1", "Seoul", 60.0)],
        },
    );
    state.selected_sport = Some("swimming".to_string());
    state.loading = true;

    // A late soccer response must not clobber state or clear the busy flag
    // owned by the swimming request.
    apply_delta(
        &mut state,
        Delta::SetSportData {
            sport: "soccer".to_string(),
            metrics: vec![metric("r2", 1.0, 1.0)],
            rank: vec![rank("r2", "Busan", 0.0)],
        },
    );
    assert!(state.loading);
    assert_eq!(state.metric_map["r1"].edi, 60.0);
    assert_eq!(state.rank_list[0].region_id, "r1");
    assert_eq!(state.active_region_id.as_deref(), Some("r1"));

    // The swimming response itself still applies.
    apply_delta(
        &mut state,
        Delta::SetSportData {
            sport: "swimming".to_string(),
            metrics: vec![metric("r2", 40.0, 10.0)],
            rank: vec![rank("r2", "Busan", 30.0)],
        },
    );
    assert!(!state.loading);
    assert_eq!(state.active_region_id.as_deref(), Some("r2"));
}

#[test]
fn stale_sport_failure_is_discarded() {
    let mut state = AppState::new();
    apply_delta(&mut state, initial_delta());
    state.selected_sport = Some("swimming".to_string());
    state.loading = true;

    apply_delta(
        &mut state,
        Delta::SportDataFailed {
            sport: "soccer".to_string(),
            error: "timeout".to_string(),
        },
    );
    assert!(state.loading);
    assert!(state.notice.is_none());
}

#[test]
fn sport_failure_keeps_previous_data_and_clears_loading() {
    let mut state = AppState::new();
    apply_delta(&mut state, initial_delta());
    apply_delta(
        &mut state,
        Delta::SetSportData {
            sport: "soccer".to_string(),
            metrics: vec![metric("r1", 80.0, 20.0)],
            rank: vec![rank("r1", "Seoul", 60.0)],
        },
    );
    state.loading = true;

    apply_delta(
        &mut state,
        Delta::SportDataFailed {
            sport: "soccer".to_string(),
            error: "500 internal server error".to_string(),
        },
    );
    assert!(!state.loading);
    assert!(state.notice.is_some());
    // Stale but consistent: collections and selection unchanged.
    assert_eq!(state.metrics.len(), 1);
    assert_eq!(state.rank_list.len(), 1);
    assert_eq!(state.active_region_id.as_deref(), Some("r1"));
}

#[test]
fn log_delta_lands_in_the_ring() {
    let mut state = AppState::new();
    apply_delta(&mut state, Delta::Log("[INFO] hello".to_string()));
    assert_eq!(state.logs.back().map(String::as_str), Some("[INFO] hello"));
}
