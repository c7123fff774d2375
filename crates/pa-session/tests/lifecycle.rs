use pa_session::{
    CloseOutcome, MemorySimulator, PhaseProperty, SessionPhase, SessionRegistry, SessionState,
    SimulatorBackend,
};

#[test]
fn save_close_and_reopen_project() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("amine.pmx");

    let mut sim = MemorySimulator::new();
    let mut state = SessionState::new();
    state.connect(&mut sim, false).unwrap();
    state.create_project(&mut sim, "Sweetening").unwrap();

    let fs = state.require_flowsheet_active().unwrap();
    sim.add_component(fs, "Methane").unwrap();
    state.create_stream(&mut sim, "Sour Gas", None).unwrap();
    sim.set_stream_property(fs, "Sour Gas", PhaseProperty::Temperature, 310.0)
        .unwrap();

    state.save_project(&mut sim, &path).unwrap();
    assert_eq!(state.close_project(&mut sim).unwrap(), CloseOutcome::Closed);
    assert_eq!(state.phase(), SessionPhase::Disconnected);

    state.connect(&mut sim, false).unwrap();
    assert!(state.open_project(&mut sim, &path).unwrap());
    let fs = state.require_flowsheet_active().unwrap();
    assert_eq!(sim.stream_names(fs).unwrap(), vec!["Sour Gas"]);
    assert_eq!(
        sim.stream_property(fs, "Sour Gas", PhaseProperty::Temperature)
            .unwrap(),
        Some(310.0)
    );
}

#[test]
fn opening_a_missing_file_keeps_connection() {
    let dir = tempfile::tempdir().unwrap();
    let mut sim = MemorySimulator::new();
    let mut state = SessionState::new();
    state.connect(&mut sim, true).unwrap();

    assert!(state
        .open_project(&mut sim, &dir.path().join("nope.pmx"))
        .is_err());
    assert_eq!(state.phase(), SessionPhase::Connected);
    assert!(state.gui_mode());
}

#[test]
fn registry_sessions_are_isolated() {
    let mut registry = SessionRegistry::new(2, 3600);
    let a = registry.create(Box::new(MemorySimulator::new())).unwrap();
    let b = registry.create(Box::new(MemorySimulator::new())).unwrap();

    {
        let session = registry.get_mut(a).unwrap();
        session.state.connect(session.backend.as_mut(), true).unwrap();
        session
            .state
            .create_project(session.backend.as_mut(), "Main")
            .unwrap();
        session
            .state
            .create_stream(session.backend.as_mut(), "S1", None)
            .unwrap();
    }

    let other = registry.get_mut(b).unwrap();
    assert_eq!(other.state.phase(), SessionPhase::Disconnected);
    assert_eq!(other.state.shape_count(), 0);

    registry.destroy(a).unwrap();
    assert!(registry.get(a).is_none());
    assert_eq!(registry.len(), 1);
}
