//! Build Event Protocol support.
//!
//! The build tool writes its event stream as consecutive length-delimited
//! protobuf records. [`decode_stream`] turns such a stream into typed
//! [`Event`]s; [`encode_stream`] produces one (used for fixtures).

pub mod proto;
mod stream;

pub use stream::{decode_stream, encode_stream, read_event_file};

use proto::build_event::Payload;

/// An output artifact declared by a completed target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Location of the artifact; only `file://` URIs can be staged.
    pub uri: String,
    /// Display name reported by the build tool.
    pub name: String,
}

impl ArtifactRef {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
        }
    }
}

/// Payload of a target-completed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCompletion {
    pub success: bool,
    /// Declared outputs, in stream order.
    pub artifacts: Vec<ArtifactRef>,
}

/// A decoded build event.
///
/// Only [`Event::Completed`] carries data the pipeline acts on. Payload kinds
/// this crate does not know about decode as [`Event::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Progress,
    Aborted,
    LoadingFailed,
    AnalysisFailed,
    Started,
    CommandLine,
    OptionsParsed,
    WorkspaceStatus,
    Configuration,
    Expanded,
    Configured,
    Action,
    NamedSetOfFiles,
    Completed(TargetCompletion),
    TestResult,
    TestSummary,
    Finished,
    Unknown,
}

impl Event {
    /// Stable snake_case name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Progress => "progress",
            Event::Aborted => "aborted",
            Event::LoadingFailed => "loading_failed",
            Event::AnalysisFailed => "analysis_failed",
            Event::Started => "started",
            Event::CommandLine => "command_line",
            Event::OptionsParsed => "options_parsed",
            Event::WorkspaceStatus => "workspace_status",
            Event::Configuration => "configuration",
            Event::Expanded => "expanded",
            Event::Configured => "configured",
            Event::Action => "action",
            Event::NamedSetOfFiles => "named_set_of_files",
            Event::Completed(_) => "completed",
            Event::TestResult => "test_result",
            Event::TestSummary => "test_summary",
            Event::Finished => "finished",
            Event::Unknown => "unknown",
        }
    }
}

impl From<proto::File> for ArtifactRef {
    fn from(file: proto::File) -> Self {
        let uri = match file.file {
            Some(proto::file::File::Uri(uri)) => uri,
            // Inline contents have no location to copy from.
            Some(proto::file::File::Contents(_)) | None => String::new(),
        };
        ArtifactRef {
            uri,
            name: file.name,
        }
    }
}

impl From<proto::BuildEvent> for Event {
    fn from(event: proto::BuildEvent) -> Self {
        let Some(payload) = event.payload else {
            return Event::Unknown;
        };
        match payload {
            Payload::Progress(_) => Event::Progress,
            Payload::Aborted(_) => Event::Aborted,
            Payload::LoadingFailed(_) => Event::LoadingFailed,
            Payload::AnalysisFailed(_) => Event::AnalysisFailed,
            Payload::Started(_) => Event::Started,
            Payload::UnstructuredCommandLine(_) | Payload::StructuredCommandLine(_) => {
                Event::CommandLine
            }
            Payload::OptionsParsed(_) => Event::OptionsParsed,
            Payload::WorkspaceStatus(_) => Event::WorkspaceStatus,
            Payload::Configuration(_) => Event::Configuration,
            Payload::Expanded(_) => Event::Expanded,
            Payload::Configured(_) => Event::Configured,
            Payload::Action(_) => Event::Action,
            Payload::NamedSetOfFiles(_) => Event::NamedSetOfFiles,
            Payload::Completed(completed) => Event::Completed(TargetCompletion {
                success: completed.success,
                artifacts: completed
                    .important_output
                    .into_iter()
                    .map(ArtifactRef::from)
                    .collect(),
            }),
            Payload::TestResult(_) => Event::TestResult,
            Payload::TestSummary(_) => Event::TestSummary,
            Payload::Finished(_) => Event::Finished,
        }
    }
}

impl From<&Event> for proto::BuildEvent {
    fn from(event: &Event) -> Self {
        let payload = match event {
            Event::Progress => Some(Payload::Progress(proto::Progress {})),
            Event::Aborted => Some(Payload::Aborted(proto::Aborted {})),
            Event::LoadingFailed => Some(Payload::LoadingFailed(proto::LoadingFailed {})),
            Event::AnalysisFailed => Some(Payload::AnalysisFailed(proto::AnalysisFailed {})),
            Event::Started => Some(Payload::Started(proto::BuildStarted {})),
            Event::CommandLine => Some(Payload::StructuredCommandLine(proto::CommandLine {})),
            Event::OptionsParsed => Some(Payload::OptionsParsed(proto::OptionsParsed {})),
            Event::WorkspaceStatus => Some(Payload::WorkspaceStatus(proto::WorkspaceStatus {})),
            Event::Configuration => Some(Payload::Configuration(proto::Configuration {})),
            Event::Expanded => Some(Payload::Expanded(proto::PatternExpanded {})),
            Event::Configured => Some(Payload::Configured(proto::TargetConfigured {})),
            Event::Action => Some(Payload::Action(proto::ActionExecuted {})),
            Event::NamedSetOfFiles => Some(Payload::NamedSetOfFiles(proto::NamedSetOfFiles {})),
            Event::Completed(completion) => Some(Payload::Completed(proto::TargetComplete {
                success: completion.success,
                important_output: completion
                    .artifacts
                    .iter()
                    .map(|artifact| proto::File {
                        name: artifact.name.clone(),
                        file: Some(proto::file::File::Uri(artifact.uri.clone())),
                    })
                    .collect(),
            })),
            Event::TestResult => Some(Payload::TestResult(proto::TestResult {})),
            Event::TestSummary => Some(Payload::TestSummary(proto::TestSummary {})),
            Event::Finished => Some(Payload::Finished(proto::BuildFinished {})),
            Event::Unknown => None,
        };
        proto::BuildEvent {
            last_message: matches!(event, Event::Finished),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_payload_is_unknown() {
        let event = Event::from(proto::BuildEvent::default());
        assert_eq!(event, Event::Unknown);
        assert_eq!(event.kind(), "unknown");
    }

    #[test]
    fn test_inline_contents_have_no_uri() {
        let file = proto::File {
            name: "stamp.txt".to_string(),
            file: Some(proto::file::File::Contents(b"abc".to_vec())),
        };
        let artifact = ArtifactRef::from(file);
        assert_eq!(artifact.uri, "");
        assert_eq!(artifact.name, "stamp.txt");
    }

    #[test]
    fn test_both_command_line_forms_map_to_one_kind() {
        for payload in [
            Payload::UnstructuredCommandLine(proto::CommandLine {}),
            Payload::StructuredCommandLine(proto::CommandLine {}),
        ] {
            let event = Event::from(proto::BuildEvent {
                last_message: false,
                payload: Some(payload),
            });
            assert_eq!(event, Event::CommandLine);
        }
    }
}
