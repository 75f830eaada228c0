use super::*;
use reqwest::Url;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::mpsc::Sender;
use std::process::Command;
use std::time::{Duration, Instant};

use crate::config::PlayerSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Spawn(String),
    Probe(String),
    Suspend(usize),
    Resume(usize),
    Terminate(usize),
}

type CallLog = Rc<RefCell<Vec<Call>>>;

struct MockProcess {
    id: usize,
    log: CallLog,
    exit: Rc<Cell<Option<ExitOutcome>>>,
    terminated: bool,
}

impl PlayerProcess for MockProcess {
    fn suspend(&mut self) -> Result<(), PlaybackError> {
        self.log.borrow_mut().push(Call::Suspend(self.id));
        Ok(())
    }

    fn resume(&mut self) -> Result<(), PlaybackError> {
        self.log.borrow_mut().push(Call::Resume(self.id));
        Ok(())
    }

    fn terminate(&mut self) -> Result<(), PlaybackError> {
        if !self.terminated {
            self.terminated = true;
            self.log.borrow_mut().push(Call::Terminate(self.id));
        }
        Ok(())
    }

    fn try_wait(&mut self) -> Result<Option<ExitOutcome>, PlaybackError> {
        Ok(self.exit.take())
    }
}

struct MockBackend {
    log: CallLog,
    spawned: usize,
    fail_spawn: Rc<Cell<bool>>,
    probe_secs: Rc<Cell<Option<f64>>>,
    pending_probes: Rc<RefCell<Vec<Sender<f64>>>>,
    exit: Rc<Cell<Option<ExitOutcome>>>,
}

impl PlayerBackend for MockBackend {
    fn spawn(&mut self, url: &Url) -> Result<Box<dyn PlayerProcess>, PlaybackError> {
        self.log.borrow_mut().push(Call::Spawn(url.to_string()));
        if self.fail_spawn.get() {
            return Err(PlaybackError::Spawn {
                command: "mock-player".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            });
        }
        self.spawned += 1;
        Ok(Box::new(MockProcess {
            id: self.spawned,
            log: self.log.clone(),
            exit: self.exit.clone(),
            terminated: false,
        }))
    }

    fn probe_duration(&mut self, url: &Url) -> DurationProbe {
        self.log.borrow_mut().push(Call::Probe(url.to_string()));
        let (tx, probe) = DurationProbe::channel();
        match self.probe_secs.get() {
            Some(secs) => {
                let _ = tx.send(secs);
            }
            // Resolved later through `Harness::resolve_probe`.
            None => self.pending_probes.borrow_mut().push(tx),
        }
        probe
    }
}

#[derive(Clone)]
struct ManualClock(Rc<Cell<Instant>>);

impl ManualClock {
    fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.0.get()
    }
}

struct Harness {
    controller: PlaybackController,
    log: CallLog,
    clock: ManualClock,
    fail_spawn: Rc<Cell<bool>>,
    pending_probes: Rc<RefCell<Vec<Sender<f64>>>>,
    exit: Rc<Cell<Option<ExitOutcome>>>,
}

impl Harness {
    fn new(probe_secs: Option<f64>) -> Self {
        Self::with_base(probe_secs, "http://catalog.test:3000")
    }

    fn with_base(probe_secs: Option<f64>, base_url: &str) -> Self {
        let log: CallLog = Rc::default();
        let fail_spawn = Rc::new(Cell::new(false));
        let exit = Rc::new(Cell::new(None));
        let pending_probes: Rc<RefCell<Vec<Sender<f64>>>> = Rc::default();
        let backend = MockBackend {
            log: log.clone(),
            spawned: 0,
            fail_spawn: fail_spawn.clone(),
            probe_secs: Rc::new(Cell::new(probe_secs)),
            pending_probes: pending_probes.clone(),
            exit: exit.clone(),
        };
        let clock = ManualClock(Rc::new(Cell::new(Instant::now())));
        let controller = PlaybackController::new(
            Box::new(backend),
            Box::new(clock.clone()),
            Url::parse(base_url).unwrap(),
        );
        Self {
            controller,
            log,
            clock,
            fail_spawn,
            pending_probes,
            exit,
        }
    }

    /// Answer the `n`th unresolved probe. Returns false if its session is gone.
    fn resolve_probe(&self, n: usize, secs: f64) -> bool {
        self.pending_probes.borrow()[n].send(secs).is_ok()
    }

    /// Advance the clock one tick period and poll, `n` times.
    fn run_ticks(&mut self, n: u32) {
        for _ in 0..n {
            self.clock.advance(TICK_PERIOD);
            self.controller.poll();
        }
    }

    fn messages(&mut self) -> Vec<String> {
        self.controller
            .drain_events()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }
}

#[test]
fn toggle_pause_without_session_is_idempotent_noop() {
    let mut h = Harness::new(Some(200.0));
    for _ in 0..3 {
        h.controller.toggle_pause();
    }

    assert_eq!(h.messages(), vec!["No audio playing"; 3]);
    assert!(h.controller.session().is_none());
    assert!(h.calls().is_empty());
}

#[test]
fn play_spawns_player_and_probe_against_same_url() {
    let mut h = Harness::new(Some(200.0));
    h.controller.play("Rock/Band/01 Intro.mp3");

    let url = "http://catalog.test:3000/songs/01%20Intro.mp3".to_string();
    assert_eq!(h.calls(), vec![Call::Spawn(url.clone()), Call::Probe(url)]);
    assert_eq!(h.messages(), vec!["Now playing: 01 Intro.mp3"]);

    let session = h.controller.session().unwrap();
    assert!(session.is_playing);
    assert_eq!(session.elapsed_time, 0);
    assert_eq!(session.track_path, "Rock/Band/01 Intro.mp3");
}

#[test]
fn new_play_terminates_previous_process_before_spawning() {
    let mut h = Harness::new(Some(200.0));
    h.controller.play("a.mp3");
    h.controller.poll();
    h.run_ticks(5);
    assert_eq!(h.controller.session().unwrap().elapsed_time, 5);

    h.controller.play("b.mp3");

    let calls = h.calls();
    let terminate = calls.iter().position(|c| *c == Call::Terminate(1)).unwrap();
    let second_spawn = calls
        .iter()
        .position(|c| *c == Call::Spawn("http://catalog.test:3000/songs/b.mp3".into()))
        .unwrap();
    assert!(terminate < second_spawn);

    let session = h.controller.session().unwrap();
    assert_eq!(session.track_path, "b.mp3");
    assert_eq!(session.elapsed_time, 0);
    assert_eq!(h.controller.progress_state(), ProgressState::Idle);
    assert!(!h.controller.has_tick_timer());
}

#[test]
fn fifty_ticks_of_two_hundred_seconds_is_a_quarter() {
    let mut h = Harness::new(Some(200.0));
    h.controller.play("a.mp3");
    h.controller.poll();
    assert_eq!(h.controller.progress_state(), ProgressState::Ticking);

    h.run_ticks(50);

    assert_eq!(h.controller.percent(), 25.0);
    assert_eq!(h.controller.elapsed(), Duration::from_secs(50));
    assert_eq!(h.controller.duration(), Some(Duration::from_secs(200)));
}

#[test]
fn zero_duration_never_computes_percent() {
    let mut h = Harness::new(Some(0.0));
    h.controller.play("a.mp3");
    h.controller.poll();

    h.run_ticks(30);

    assert_eq!(h.controller.progress_state(), ProgressState::Idle);
    assert_eq!(h.controller.percent(), 0.0);
    assert_eq!(h.controller.elapsed(), Duration::ZERO);
    assert_eq!(h.controller.duration(), None);
    assert!(h.controller.is_playing());
}

#[test]
fn progress_waits_for_probe() {
    let mut h = Harness::new(None);
    h.controller.play("a.mp3");
    h.run_ticks(10);

    assert_eq!(h.controller.progress_state(), ProgressState::Idle);
    assert_eq!(h.controller.elapsed(), Duration::ZERO);
}

#[test]
fn paused_ticks_do_not_advance_elapsed() {
    let mut h = Harness::new(Some(100.0));
    h.controller.play("a.mp3");
    h.controller.poll();
    h.run_ticks(10);

    h.controller.toggle_pause();
    h.run_ticks(20);
    assert_eq!(h.controller.elapsed(), Duration::from_secs(10));
    assert!(h.controller.has_tick_timer());

    h.controller.toggle_pause();
    h.run_ticks(5);
    assert_eq!(h.controller.elapsed(), Duration::from_secs(15));
    assert_eq!(h.controller.percent(), 15.0);

    let messages = h.messages();
    assert_eq!(&messages[1..], &["Paused", "Playing..."]);
    assert!(h.calls().contains(&Call::Suspend(1)));
    assert!(h.calls().contains(&Call::Resume(1)));
}

#[test]
fn reaching_duration_completes_and_clamps() {
    let mut h = Harness::new(Some(9.4));
    h.controller.play("a.mp3");
    h.controller.poll();

    h.run_ticks(9);
    assert_eq!(h.controller.progress_state(), ProgressState::Ticking);
    assert!(h.controller.percent() < 100.0);

    h.run_ticks(1);
    assert_eq!(h.controller.progress_state(), ProgressState::Complete);
    assert_eq!(h.controller.percent(), 100.0);
    assert!(!h.controller.has_tick_timer());

    h.run_ticks(5);
    assert_eq!(h.controller.elapsed(), Duration::from_secs(10));
}

#[test]
fn lagging_loop_catches_up_on_missed_ticks() {
    let mut h = Harness::new(Some(100.0));
    h.controller.play("a.mp3");
    h.controller.poll();

    h.clock.advance(Duration::from_millis(4500));
    h.controller.poll();
    assert_eq!(h.controller.elapsed(), Duration::from_secs(4));
}

#[test]
fn spawn_failure_leaves_no_session() {
    let mut h = Harness::new(Some(100.0));
    h.fail_spawn.set(true);
    h.controller.play("broken.mp3");

    assert!(h.controller.session().is_none());
    assert!(!h.controller.is_playing());
    assert_eq!(h.messages(), vec!["Error playing: broken.mp3"]);
    assert!(!h.calls().iter().any(|c| matches!(c, Call::Probe(_))));
}

#[test]
fn unusable_base_url_fails_before_spawning() {
    let mut h = Harness::with_base(Some(100.0), "mailto:catalog@example.com");
    h.controller.play("a.mp3");

    assert!(h.controller.session().is_none());
    assert_eq!(h.messages(), vec!["Error playing: a.mp3"]);
    assert!(h.calls().is_empty());
}

#[test]
fn abnormal_exit_clears_session_and_notifies() {
    let mut h = Harness::new(Some(100.0));
    h.controller.play("a.mp3");
    h.controller.poll();
    h.run_ticks(3);
    h.messages();

    h.exit.set(Some(ExitOutcome::Signal(9)));
    h.controller.poll();

    assert!(h.controller.session().is_none());
    assert_eq!(h.controller.progress_state(), ProgressState::Idle);
    assert!(!h.controller.has_tick_timer());
    assert_eq!(h.messages(), vec!["Playback ended: a.mp3"]);
}

#[test]
fn clean_exit_reports_finished() {
    let mut h = Harness::new(Some(100.0));
    h.controller.play("a.mp3");
    h.messages();

    h.exit.set(Some(ExitOutcome::Success));
    h.controller.poll();

    assert!(h.controller.session().is_none());
    assert_eq!(h.messages(), vec!["Finished: a.mp3"]);
}

#[test]
fn stop_terminates_and_is_silent_when_idle() {
    let mut h = Harness::new(Some(100.0));
    h.controller.stop();
    assert!(h.messages().is_empty());

    h.controller.play("a.mp3");
    h.controller.poll();
    h.messages();
    h.controller.stop();

    assert!(h.controller.session().is_none());
    assert!(!h.controller.has_tick_timer());
    assert_eq!(h.calls().last(), Some(&Call::Terminate(1)));
    assert_eq!(h.messages(), vec!["Stopped: a.mp3"]);

    h.controller.toggle_pause();
    assert_eq!(h.messages(), vec!["No audio playing"]);
}

#[test]
fn superseded_probe_result_is_discarded() {
    let mut h = Harness::new(None);
    h.controller.play("slow.mp3");
    h.controller.play("next.mp3");

    assert!(!h.resolve_probe(0, 50.0));
    h.run_ticks(3);
    assert_eq!(h.controller.duration(), None);
    assert_eq!(h.controller.progress_state(), ProgressState::Idle);

    assert!(h.resolve_probe(1, 200.0));
    h.controller.poll();
    assert_eq!(h.controller.duration(), Some(Duration::from_secs(200)));
    assert_eq!(h.controller.progress_state(), ProgressState::Ticking);
    assert_eq!(h.controller.session().unwrap().track_path, "next.mp3");
}

#[test]
fn parse_duration_downgrades_garbage_to_zero() {
    assert_eq!(parse_duration("215.146122\n"), 215.146122);
    assert_eq!(parse_duration("\n  42\n"), 42.0);
    assert_eq!(parse_duration("N/A"), 0.0);
    assert_eq!(parse_duration(""), 0.0);
    assert_eq!(parse_duration("-3"), 0.0);
    assert_eq!(parse_duration("inf"), 0.0);
}

#[test]
fn percent_of_clamps_and_guards_zero() {
    assert_eq!(percent_of(50, 200.0), 25.0);
    assert_eq!(percent_of(10, 9.4), 100.0);
    assert_eq!(percent_of(10, 0.0), 0.0);
}

#[test]
fn tick_timer_reports_each_elapsed_period() {
    let start = Instant::now();
    let mut timer = TickTimer::start(start, Duration::from_secs(1));
    assert_eq!(timer.due(start + Duration::from_millis(999)), 0);
    assert_eq!(timer.due(start + Duration::from_secs(1)), 1);
    assert_eq!(timer.due(start + Duration::from_millis(3500)), 2);
    assert_eq!(timer.due(start + Duration::from_millis(3600)), 0);
}

#[test]
fn exit_outcome_classification() {
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    assert_eq!(ExitOutcome::from(ExitStatus::from_raw(0)), ExitOutcome::Success);
    assert_eq!(ExitOutcome::from(ExitStatus::from_raw(1 << 8)), ExitOutcome::Code(1));
    assert_eq!(ExitOutcome::from(ExitStatus::from_raw(15)), ExitOutcome::Signal(15));
    assert!(!ExitOutcome::Success.is_abnormal());
    assert!(ExitOutcome::Code(2).is_abnormal());
}

fn shell_backend(script: &str) -> ExternalBackend {
    ExternalBackend::new(PlayerSettings {
        command: "sh".into(),
        // The stream URL lands in $1 and is ignored.
        args: vec!["-c".into(), script.into(), "player".into()],
        probe_command: "true".into(),
    })
}

fn stream_url() -> Url {
    Url::parse("http://127.0.0.1:9/songs/a.mp3").unwrap()
}

fn wait_for_exit(process: &mut dyn PlayerProcess) -> ExitOutcome {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(outcome) = process.try_wait().unwrap() {
            return outcome;
        }
        assert!(Instant::now() < deadline, "player did not exit");
        std::thread::sleep(Duration::from_millis(20));
    }
}

fn wait_for_probe(probe: &DurationProbe) -> f64 {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(secs) = probe.try_take() {
            return secs;
        }
        assert!(Instant::now() < deadline, "probe did not finish");
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn external_player_terminates_while_suspended() {
    let mut backend = shell_backend("exec sleep 30");
    let mut process = backend.spawn(&stream_url()).unwrap();

    process.suspend().unwrap();
    process.terminate().unwrap();

    assert_eq!(process.try_wait().unwrap(), Some(ExitOutcome::Signal(9)));
    // Already reaped; a second terminate is a no-op.
    process.terminate().unwrap();
}

#[test]
fn external_player_reports_exit_code() {
    let mut backend = shell_backend("exit 3");
    let mut process = backend.spawn(&stream_url()).unwrap();

    assert_eq!(wait_for_exit(process.as_mut()), ExitOutcome::Code(3));
}

#[test]
fn missing_player_binary_is_a_spawn_error() {
    let mut backend = ExternalBackend::new(PlayerSettings {
        command: "/nonexistent/cadenza-player".into(),
        ..PlayerSettings::default()
    });
    let err = backend.spawn(&stream_url()).err().unwrap();
    assert!(matches!(err, PlaybackError::Spawn { .. }));
}

#[test]
fn external_probe_parses_stdout() {
    let mut command = Command::new("sh");
    command.args(["-c", "echo 215.5"]);
    assert_eq!(wait_for_probe(&DurationProbe::run(command)), 215.5);

    let mut failing = Command::new("sh");
    failing.args(["-c", "echo 99; exit 1"]);
    assert_eq!(wait_for_probe(&DurationProbe::run(failing)), 0.0);

    let missing = DurationProbe::run(Command::new("/nonexistent/cadenza-probe"));
    assert_eq!(missing.try_take(), Some(0.0));
}

#[test]
fn dropping_an_unfinished_probe_kills_the_prober() {
    let dir = tempfile::tempdir().unwrap();
    let script = "sleep 1; touch \"$0\"";

    let finished = dir.path().join("finished");
    let mut command = Command::new("sh");
    command.args(["-c", script]).arg(&finished);
    let probe = DurationProbe::run(command);
    wait_for_probe(&probe);
    assert!(finished.exists());

    let cancelled = dir.path().join("cancelled");
    let mut command = Command::new("sh");
    command.args(["-c", script]).arg(&cancelled);
    drop(DurationProbe::run(command));

    std::thread::sleep(Duration::from_millis(1800));
    assert!(!cancelled.exists());
}
