//! The filter engine: lifecycle state machine around one codec.
//!
//! ```text
//! Idle ──begin_encode──▶ Encoding ──end_encode──▶ Idle
//!   │                       │
//!   │                  error / fail()
//!   │                       ▼
//!   └──begin_decode──▶ Decoding ──error / fail()──▶ Failed
//! ```
//!
//! `Failed` accepts a new begin, which re-arms the engine. Lifecycle
//! violations are reported as usage errors and leave the state untouched.

use super::{DecodeParms, FilterKind, OutputSink};
use crate::codec::{Codec, StreamCodec};
use crate::error::{PdfError, Result};

/// Lifecycle state of a [`FilterEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    Idle,
    Encoding,
    Decoding,
    Failed,
}

impl FilterState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Encoding | Self::Decoding)
    }

    fn can_begin(self) -> bool {
        matches!(self, Self::Idle | Self::Failed)
    }
}

/// One codec plus the sink it writes to while a session is open.
pub struct FilterEngine<S: OutputSink = Vec<u8>> {
    codec: Codec,
    sink: Option<S>,
    state: FilterState,
}

impl<S: OutputSink> FilterEngine<S> {
    pub fn new(codec: impl Into<Codec>) -> Self {
        Self {
            codec: codec.into(),
            sink: None,
            state: FilterState::Idle,
        }
    }

    /// Engine for a filter that needs no construction arguments.
    pub fn from_kind(kind: FilterKind) -> Result<Self> {
        Codec::for_kind(kind).map(Self::new)
    }

    pub fn kind(&self) -> FilterKind {
        self.codec.kind()
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub(crate) fn sink_mut(&mut self) -> Option<&mut S> {
        self.sink.as_mut()
    }

    fn begin(&mut self, target: FilterState, sink: S, parms: Option<&DecodeParms>) -> Result<()> {
        if !self.state.can_begin() {
            return Err(PdfError::usage(format!(
                "{}: begin while {:?}",
                self.kind(),
                self.state
            )));
        }
        let supported = match target {
            FilterState::Encoding => self.codec.can_encode(),
            _ => self.codec.can_decode(),
        };
        if !supported {
            return Err(PdfError::config(format!(
                "{} cannot be used for {target:?}",
                self.kind()
            )));
        }
        tracing::debug!(filter = %self.kind(), state = ?target, "filter session started");
        self.sink = Some(sink);
        self.state = target;
        self.run(|codec, sink| match target {
            FilterState::Encoding => codec.begin_encode(sink),
            _ => codec.begin_decode(sink, parms),
        })
    }

    fn expect(&self, state: FilterState, op: &str) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(PdfError::usage(format!(
                "{}: {op} while {:?}",
                self.kind(),
                self.state
            )))
        }
    }

    /// Run a codec hook against the bound sink; any error fails the engine.
    fn run<F>(&mut self, hook: F) -> Result<()>
    where
        F: FnOnce(&mut Codec, &mut dyn OutputSink) -> Result<()>,
    {
        let Some(sink) = self.sink.as_mut() else {
            return Err(PdfError::usage(format!("{}: no sink bound", self.kind())));
        };
        let result = hook(&mut self.codec, sink);
        if let Err(err) = &result {
            tracing::warn!(filter = %self.codec.kind(), error = %err, "filter failed");
            self.sink = None;
            self.state = FilterState::Failed;
        }
        result
    }

    fn end(&mut self, state: FilterState, op: &str) -> Result<S> {
        self.expect(state, op)?;
        self.run(|codec, sink| {
            match state {
                FilterState::Encoding => codec.end_encode(sink)?,
                _ => codec.end_decode(sink)?,
            }
            sink.flush()
        })?;
        let sink = self
            .sink
            .take()
            .ok_or_else(|| PdfError::usage(format!("{}: no sink bound", self.kind())))?;
        self.state = FilterState::Idle;
        tracing::debug!(filter = %self.kind(), "filter session finished");
        Ok(sink)
    }

    pub fn begin_encode(&mut self, sink: S) -> Result<()> {
        self.begin(FilterState::Encoding, sink, None)
    }

    pub fn begin_decode(&mut self, sink: S, parms: Option<&DecodeParms>) -> Result<()> {
        self.begin(FilterState::Decoding, sink, parms)
    }

    pub fn encode_block(&mut self, data: &[u8]) -> Result<()> {
        self.expect(FilterState::Encoding, "encode_block")?;
        self.run(|codec, sink| codec.encode_block(sink, data))
    }

    pub fn decode_block(&mut self, data: &[u8]) -> Result<()> {
        self.expect(FilterState::Decoding, "decode_block")?;
        self.run(|codec, sink| codec.decode_block(sink, data))
    }

    /// Flush the codec and the sink, then hand the sink back.
    pub fn end_encode(&mut self) -> Result<S> {
        self.end(FilterState::Encoding, "end_encode")
    }

    pub fn end_decode(&mut self) -> Result<S> {
        self.end(FilterState::Decoding, "end_decode")
    }

    /// Abandon the open session without running codec hooks.
    pub fn fail(&mut self) -> Result<S> {
        if !self.state.is_active() {
            return Err(PdfError::usage(format!(
                "{}: fail while {:?}",
                self.kind(),
                self.state
            )));
        }
        self.state = FilterState::Failed;
        tracing::warn!(filter = %self.kind(), "filter session abandoned");
        self.sink
            .take()
            .ok_or_else(|| PdfError::usage(format!("{}: no sink bound", self.kind())))
    }

    /// Encode `input` in one session.
    pub fn encode_to(&mut self, sink: S, input: &[u8]) -> Result<S> {
        self.begin_encode(sink)?;
        self.encode_block(input)?;
        self.end_encode()
    }

    /// Decode `input` in one session.
    pub fn decode_to(&mut self, sink: S, input: &[u8], parms: Option<&DecodeParms>) -> Result<S> {
        self.begin_decode(sink, parms)?;
        self.decode_block(input)?;
        self.end_decode()
    }
}

impl FilterEngine<Vec<u8>> {
    pub fn encode(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.encode_to(Vec::with_capacity(input.len()), input)
    }

    pub fn decode(&mut self, input: &[u8], parms: Option<&DecodeParms>) -> Result<Vec<u8>> {
        self.decode_to(Vec::with_capacity(input.len()), input, parms)
    }

    /// Drain what the codec has written so far.
    pub(crate) fn take_output(&mut self) -> Vec<u8> {
        self.sink_mut().map(std::mem::take).unwrap_or_default()
    }
}
