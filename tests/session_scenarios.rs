//! End-to-end session scenarios
//!
//! Runs the full harness (trajectory file, telemetry log, session loop,
//! summary plotter) against a scripted device.

use std::path::{Path, PathBuf};

use liftoff_hil::plot::{EventSummaryPlotter, FlightSummary};
use liftoff_hil::transports::scripted::{Chunk, ScriptedTransport};
use liftoff_hil::{Harness, HarnessConfig, HarnessError, SessionEnd, log_path_for};

fn workspace(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("liftoff-hil-it-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn write_trajectory(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("launch-09.txt");
    std::fs::write(&path, text).expect("write trajectory");
    path
}

fn config() -> HarnessConfig {
    HarnessConfig { settling_delay_s: 0.0, ..Default::default() }
}

#[tokio::test]
async fn full_session_ends_on_liftoff() {
    let dir = workspace("liftoff");
    let trajectory = write_trajectory(&dir, "# t h\n0 0\n10 100\n");

    let transport = ScriptedTransport::new([
        Chunk::Data(b"boot noise\r\n<1,5000>".to_vec()),
        Chunk::Idle,
        Chunk::Data(b"<2,5000,0.00,0.00,P>\r\n<2,5".to_vec()),
        Chunk::Data(b"100,0.00,0.00,P>\r\n".to_vec()),
        Chunk::Data(b"<1,7500><2,5200,0.31,6.20,L>\r\n<2,5300,0.95,12.4,L>".to_vec()),
    ]);
    let writes = transport.write_log();

    let report = Harness::run(transport, &trajectory, &config(), &EventSummaryPlotter)
        .await
        .expect("session starts");

    assert!(report.is_liftoff(), "{:?}", report.end);
    assert_eq!(writes.frames_as_text(), vec!["<6,1>", "<7,5000>", "<7,7500>"]);
    assert!(writes.is_closed());
    assert_eq!((report.previous_state.as_str(), report.current_state.as_str()), ("P", "L"));
    assert_eq!(report.stats.telemetry_lines, 3);
    assert_eq!(report.stats.requests_answered, 2);
    assert_eq!(report.stats.dropped_bytes, "boot noise".len() as u64);

    let log_path = log_path_for(&trajectory);
    assert_eq!(report.log_path, log_path);
    let log = std::fs::read_to_string(&log_path).expect("log written");
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines, vec!["2,5000,0.00,0.00,P", "2,5100,0.00,0.00,P", "2,5200,0.31,6.20,L"]);

    let summary_yaml = std::fs::read_to_string(EventSummaryPlotter::summary_path(&log_path))
        .expect("summary written");
    let summary: FlightSummary = serde_yaml_ng::from_str(&summary_yaml).expect("summary parses");
    assert_eq!(summary.title, trajectory.display().to_string());
    assert_eq!(summary.events.len(), 1);
    assert_eq!(summary.events[0].state, "L");
    assert_eq!(summary.events[0].time_s, 5.1);
}

#[tokio::test]
async fn transport_loss_still_plots_recorded_telemetry() {
    let dir = workspace("transport_loss");
    let trajectory = write_trajectory(&dir, "0 0\n1 10\n2 40\n");

    let transport = ScriptedTransport::from_text(["<2,0,0,0,P>", "<2,10,0,0,P>", "<1,1"]);
    let report = Harness::run(transport, &trajectory, &config(), &EventSummaryPlotter)
        .await
        .expect("session starts");

    assert!(matches!(report.end, SessionEnd::Fault(HarnessError::TransportClosed)));
    assert!(report.plot_error.is_none());

    let log = std::fs::read_to_string(&report.log_path).expect("log written");
    assert_eq!(log.lines().count(), 2);
    assert!(EventSummaryPlotter::summary_path(&report.log_path).exists());
}

#[tokio::test]
async fn malformed_request_ends_session() {
    let dir = workspace("malformed_request");
    let trajectory = write_trajectory(&dir, "0 0\n1 10\n");

    let transport = ScriptedTransport::from_text(["<2,0,0,0,P><1,oops><2,1,0,0,P>"]);
    let writes = transport.write_log();
    let report = Harness::run(transport, &trajectory, &config(), &EventSummaryPlotter)
        .await
        .expect("session starts");

    assert!(matches!(report.end, SessionEnd::Fault(HarnessError::FrameParse { .. })));
    assert_eq!(report.stats.telemetry_lines, 1);
    assert_eq!(writes.frames_as_text(), vec!["<6,1>"]);
    assert!(writes.is_closed());
}

#[tokio::test]
async fn pre_session_errors_never_touch_the_transport() {
    let dir = workspace("pre_session");

    let transport = ScriptedTransport::from_text(["<1,0>"]);
    let writes = transport.write_log();
    let missing = dir.join("missing.txt");
    let result = Harness::run(transport, &missing, &config(), &EventSummaryPlotter).await;
    assert!(matches!(result, Err(HarnessError::TrajectoryFile { .. })));
    assert!(writes.frames().is_empty());

    let duplicate = write_trajectory(&dir, "0 0\n1 10\n1 20\n");
    let result =
        Harness::run(ScriptedTransport::from_text([""]), &duplicate, &config(), &EventSummaryPlotter)
            .await;
    assert!(matches!(result, Err(HarnessError::InvalidTrajectory { .. })));

    let trajectory = write_trajectory(&dir, "0 0\n1 10\n");
    let bad_config = HarnessConfig { frame_start: ">".to_string(), ..config() };
    let result =
        Harness::run(ScriptedTransport::from_text([""]), &trajectory, &bad_config, &EventSummaryPlotter)
            .await;
    assert!(matches!(result, Err(HarnessError::Config { .. })));
}

#[tokio::test]
async fn replayed_capture_drives_a_session() {
    let dir = workspace("replay");
    let trajectory = write_trajectory(&dir, "0 0\n10 100\n");
    let capture = dir.join("capture.bin");
    std::fs::write(&capture, b"<1,1000><2,1000,0,0,P><1,2000><2,2000,1,1,L>").expect("write capture");

    // Three bytes per read splits every frame across reads
    let transport = ScriptedTransport::from_capture(&capture, 3).expect("capture exists");
    let writes = transport.write_log();
    let report = Harness::run(transport, &trajectory, &config(), &EventSummaryPlotter)
        .await
        .expect("session starts");

    assert!(report.is_liftoff());
    assert_eq!(writes.frames_as_text(), vec!["<6,1>", "<7,1000>", "<7,2000>"]);
}
