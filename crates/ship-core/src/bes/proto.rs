//! Build Event Protocol message subset.
//!
//! Only `TargetComplete` and `File` declare fields; the other payloads are
//! declared so the `payload` oneof can be told apart, and their contents are
//! skipped by the decoder.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BuildEvent {
    #[prost(bool, tag = "20")]
    pub last_message: bool,
    #[prost(
        oneof = "build_event::Payload",
        tags = "3, 4, 11, 19, 5, 12, 22, 13, 16, 17, 6, 18, 7, 15, 8, 10, 9, 14"
    )]
    pub payload: ::core::option::Option<build_event::Payload>,
}

pub mod build_event {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "3")]
        Progress(super::Progress),
        #[prost(message, tag = "4")]
        Aborted(super::Aborted),
        #[prost(message, tag = "11")]
        LoadingFailed(super::LoadingFailed),
        #[prost(message, tag = "19")]
        AnalysisFailed(super::AnalysisFailed),
        #[prost(message, tag = "5")]
        Started(super::BuildStarted),
        #[prost(message, tag = "12")]
        UnstructuredCommandLine(super::CommandLine),
        #[prost(message, tag = "22")]
        StructuredCommandLine(super::CommandLine),
        #[prost(message, tag = "13")]
        OptionsParsed(super::OptionsParsed),
        #[prost(message, tag = "16")]
        WorkspaceStatus(super::WorkspaceStatus),
        #[prost(message, tag = "17")]
        Configuration(super::Configuration),
        #[prost(message, tag = "6")]
        Expanded(super::PatternExpanded),
        #[prost(message, tag = "18")]
        Configured(super::TargetConfigured),
        #[prost(message, tag = "7")]
        Action(super::ActionExecuted),
        #[prost(message, tag = "15")]
        NamedSetOfFiles(super::NamedSetOfFiles),
        #[prost(message, tag = "8")]
        Completed(super::TargetComplete),
        #[prost(message, tag = "10")]
        TestResult(super::TestResult),
        #[prost(message, tag = "9")]
        TestSummary(super::TestSummary),
        #[prost(message, tag = "14")]
        Finished(super::BuildFinished),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Progress {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Aborted {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoadingFailed {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnalysisFailed {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BuildStarted {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandLine {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OptionsParsed {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WorkspaceStatus {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Configuration {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PatternExpanded {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TargetConfigured {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionExecuted {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NamedSetOfFiles {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TestResult {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TestSummary {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BuildFinished {}

/// Payload of the target-completed event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TargetComplete {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(message, repeated, tag = "4")]
    pub important_output: ::prost::alloc::vec::Vec<File>,
}

/// An output file, referenced by URI or carried inline.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct File {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(oneof = "file::File", tags = "2, 3")]
    pub file: ::core::option::Option<file::File>,
}

pub mod file {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum File {
        #[prost(string, tag = "2")]
        Uri(::prost::alloc::string::String),
        #[prost(bytes, tag = "3")]
        Contents(::prost::alloc::vec::Vec<u8>),
    }
}
