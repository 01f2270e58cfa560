//! DispatchState - 1 回の dispatch の状態機械

use std::fmt;

/// Dispatch の状態
///
/// 状態遷移:
/// - Idle -> ParsingArgs -> ReadingInput -> Decoding -> Invoking
/// - Invoking -> Encoding -> WritingOutput -> Encoding -> ... -> Done
/// - input binding が無い、または対話的な端末なら ParsingArgs -> Invoking
/// - 書き出す値が無ければ Invoking -> Done
/// - Failed は終端以外の全ての状態から到達できる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchState {
    Idle,
    ParsingArgs,
    ReadingInput,
    Decoding,
    Invoking,
    Encoding,
    WritingOutput,
    Done,
    Failed,
}

impl DispatchState {
    /// 終端状態（これ以上遷移しない）かどうか
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn can_advance_to(self, next: DispatchState) -> bool {
        use DispatchState::*;

        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Idle, ParsingArgs)
                | (ParsingArgs, ReadingInput)
                | (ParsingArgs, Invoking)
                | (ReadingInput, Decoding)
                | (Decoding, Invoking)
                | (Invoking, Encoding)
                | (Invoking, Done)
                | (Encoding, WritingOutput)
                | (WritingOutput, Encoding)
                | (WritingOutput, Done)
        )
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ParsingArgs => "parsing_args",
            Self::ReadingInput => "reading_input",
            Self::Decoding => "decoding",
            Self::Invoking => "invoking",
            Self::Encoding => "encoding",
            Self::WritingOutput => "writing_output",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 1 回の dispatch の現在状態（遷移を trace ログに出す）
#[derive(Debug)]
pub(crate) struct StateCursor {
    state: DispatchState,
}

impl StateCursor {
    pub(crate) fn new() -> Self {
        Self {
            state: DispatchState::Idle,
        }
    }

    pub(crate) fn state(&self) -> DispatchState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: DispatchState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal dispatch transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!(from = %self.state, to = %next, "dispatch transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DispatchState::Idle, DispatchState::ParsingArgs)]
    #[case(DispatchState::ParsingArgs, DispatchState::ReadingInput)]
    #[case(DispatchState::ParsingArgs, DispatchState::Invoking)]
    #[case(DispatchState::Invoking, DispatchState::Done)]
    #[case(DispatchState::WritingOutput, DispatchState::Encoding)]
    #[case(DispatchState::Decoding, DispatchState::Failed)]
    fn legal_transitions(#[case] from: DispatchState, #[case] to: DispatchState) {
        assert!(from.can_advance_to(to));
    }

    #[rstest]
    #[case(DispatchState::Idle, DispatchState::Invoking)]
    #[case(DispatchState::Decoding, DispatchState::ReadingInput)]
    #[case(DispatchState::Encoding, DispatchState::Done)]
    #[case(DispatchState::Done, DispatchState::Failed)]
    #[case(DispatchState::Failed, DispatchState::Idle)]
    fn illegal_transitions(#[case] from: DispatchState, #[case] to: DispatchState) {
        assert!(!from.can_advance_to(to));
    }

    #[test]
    fn cursor_starts_idle() {
        let mut cursor = StateCursor::new();
        assert_eq!(cursor.state(), DispatchState::Idle);
        cursor.advance(DispatchState::ParsingArgs);
        assert_eq!(cursor.state(), DispatchState::ParsingArgs);
        assert!(!cursor.state().is_terminal());
    }
}
