mod event;
mod sink;

use std::sync::Arc;

pub use event::*;
pub use sink::*;

/// Unique identifier for a running operation.
pub type OperationId = u64;

/// Shared handle to an event sink.
pub type EventSinkHandle = Arc<dyn EventSink>;

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_null_sink() {
        let sink = NullSink;
        sink.emit(RunwayEvent::Log {
            level: LogLevel::Info,
            message: "test".to_string(),
        });
    }

    #[test]
    fn test_channel_sink() {
        let (sink, rx) = ChannelSink::new();
        sink.emit(RunwayEvent::StepStarted {
            op_id: 1,
            step: "timezone".into(),
        });
        sink.emit(RunwayEvent::StepFailed {
            op_id: 1,
            step: "timezone".into(),
            error: "unknown zone".into(),
        });
        sink.emit(RunwayEvent::StepCompleted {
            op_id: 2,
            step: "locale".into(),
        });

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], RunwayEvent::StepStarted { op_id: 1, .. }));
        assert!(matches!(
            &events[1],
            RunwayEvent::StepFailed { error, .. } if error == "unknown zone"
        ));
        assert!(matches!(&events[2], RunwayEvent::StepCompleted { op_id: 2, .. }));
    }

    #[test]
    fn test_channel_sink_receiver_dropped() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit(RunwayEvent::Log {
            level: LogLevel::Warning,
            message: "orphaned".to_string(),
        });
    }

    #[test]
    fn test_collector_sink() {
        let sink = CollectorSink::default();
        assert!(sink.is_empty());

        sink.emit(RunwayEvent::Package {
            op_id: 3,
            pkg_name: "htop".into(),
            stage: PackageStage::Installing,
        });
        sink.emit(RunwayEvent::Package {
            op_id: 3,
            pkg_name: "htop".into(),
            stage: PackageStage::Installed,
        });
        sink.emit(RunwayEvent::Archive {
            op_id: 4,
            path: PathBuf::from("/tmp/a.tar.gz"),
            stage: ArchiveStage::Complete {
                output: PathBuf::from("/tmp/a"),
            },
        });

        assert_eq!(sink.len(), 3);
        let events = sink.events();
        assert!(matches!(
            &events[1],
            RunwayEvent::Package {
                stage: PackageStage::Installed,
                ..
            }
        ));
        assert!(matches!(
            &events[2],
            RunwayEvent::Archive {
                stage: ArchiveStage::Complete { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_event_sink_handle() {
        let collector = Arc::new(CollectorSink::default());
        let sink: EventSinkHandle = collector.clone();
        sink.emit(RunwayEvent::BatchProgress {
            completed: 5,
            total: 10,
            failed: 1,
        });
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_event_sink_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullSink>();
        assert_send_sync::<ChannelSink>();
        assert_send_sync::<CollectorSink>();
    }
}
