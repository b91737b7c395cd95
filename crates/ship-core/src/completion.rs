//! Locating the target-completed event in a decoded stream.

use crate::bes::{Event, TargetCompletion};
use crate::error::{Result, ShipError};

/// Return the first target-completed payload, if any.
///
/// A single invocation is expected to emit exactly one.
pub fn first_target_complete(events: &[Event]) -> Option<&TargetCompletion> {
    events.iter().find_map(|event| match event {
        Event::Completed(completion) => Some(completion),
        _ => None,
    })
}

/// Require a successful completion event.
///
/// `args` is the invocation that produced `events` and is carried into the
/// error for diagnostics.
pub fn extract_completion(events: &[Event], args: &[String]) -> Result<TargetCompletion> {
    match first_target_complete(events) {
        None => Err(ShipError::NoCompletionEvent {
            args: args.to_vec(),
        }),
        Some(completion) if !completion.success => Err(ShipError::BuildNotSuccessful {
            args: args.to_vec(),
        }),
        Some(completion) => Ok(completion.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bes::ArtifactRef;

    fn args() -> Vec<String> {
        vec!["build".to_string(), "//cmd/tool".to_string()]
    }

    fn completed(success: bool, artifacts: Vec<ArtifactRef>) -> Event {
        Event::Completed(TargetCompletion { success, artifacts })
    }

    #[test]
    fn test_extracts_single_completion_in_order() {
        let a = ArtifactRef::new("file:///out/a", "a");
        let b = ArtifactRef::new("file:///out/b", "b");
        let events = vec![
            Event::Started,
            Event::Progress,
            Event::Configured,
            completed(true, vec![a.clone(), b.clone()]),
            Event::Progress,
            Event::Finished,
        ];

        let completion = extract_completion(&events, &args()).unwrap();
        assert!(completion.success);
        assert_eq!(completion.artifacts, vec![a, b]);
    }

    #[test]
    fn test_missing_completion_is_reported() {
        let events = vec![Event::Started, Event::Aborted, Event::Finished];
        let err = extract_completion(&events, &args()).unwrap_err();
        assert!(matches!(err, ShipError::NoCompletionEvent { .. }));
    }

    #[test]
    fn test_unsuccessful_completion_carries_args() {
        let events = vec![completed(false, vec![])];
        match extract_completion(&events, &args()).unwrap_err() {
            ShipError::BuildNotSuccessful { args: reported } => assert_eq!(reported, args()),
            other => panic!("expected BuildNotSuccessful, got {other:?}"),
        }
    }

    #[test]
    fn test_first_completion_wins() {
        let events = vec![
            completed(true, vec![ArtifactRef::new("file:///first", "first")]),
            completed(false, vec![]),
        ];
        let first = first_target_complete(&events).unwrap();
        assert!(first.success);
        assert_eq!(first.artifacts[0].name, "first");
    }

    #[test]
    fn test_unknown_events_are_ignored() {
        assert!(first_target_complete(&[Event::Unknown, Event::Unknown]).is_none());
    }
}
