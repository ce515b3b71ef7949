//! Filter chains: several engines feeding each other.
//!
//! Stages are kept in encode order. Decoding runs them back to front, which
//! is the order a PDF `/Filter` array lists them in.

use super::engine::{FilterEngine, FilterState};
use super::sink::put;
use super::{DecodeParms, FilterKind, OutputSink};
use crate::codec::Codec;
use crate::error::{PdfError, Result};

struct Stage {
    engine: FilterEngine<Vec<u8>>,
    parms: Option<DecodeParms>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encode,
    Decode,
}

/// An ordered stack of filter engines with one final sink.
pub struct FilterChain<S: OutputSink = Vec<u8>> {
    stages: Vec<Stage>,
    sink: Option<S>,
    state: FilterState,
}

impl<S: OutputSink> Default for FilterChain<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: OutputSink> FilterChain<S> {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            sink: None,
            state: FilterState::Idle,
        }
    }

    /// Chain of argument-free filters, in encode order.
    pub fn from_kinds(kinds: &[FilterKind]) -> Result<Self> {
        let mut chain = Self::new();
        for &kind in kinds {
            chain.push(Codec::for_kind(kind)?);
        }
        Ok(chain)
    }

    /// Chain for a PDF `/Filter` array with its `/DecodeParms`, both listed
    /// in decode order.
    pub fn from_decode_order<'a, I>(filters: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Option<DecodeParms>)>,
    {
        let mut stages = Vec::new();
        for (name, parms) in filters {
            let kind = FilterKind::from_name(name)?;
            stages.push(Stage {
                engine: FilterEngine::from_kind(kind)?,
                parms,
            });
        }
        stages.reverse();
        Ok(Self {
            stages,
            sink: None,
            state: FilterState::Idle,
        })
    }

    /// Append a stage; it runs last when encoding and first when decoding.
    pub fn push(&mut self, codec: impl Into<Codec>) -> &mut Self {
        self.push_with_parms(codec, None)
    }

    pub fn push_with_parms(&mut self, codec: impl Into<Codec>, parms: Option<DecodeParms>) -> &mut Self {
        self.stages.push(Stage {
            engine: FilterEngine::new(codec),
            parms,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Stage kinds in encode order.
    pub fn kinds(&self) -> Vec<FilterKind> {
        self.stages.iter().map(|stage| stage.engine.kind()).collect()
    }

    fn ordered(stages: &mut [Stage], direction: Direction) -> Box<dyn Iterator<Item = &mut Stage> + '_> {
        match direction {
            Direction::Encode => Box::new(stages.iter_mut()),
            Direction::Decode => Box::new(stages.iter_mut().rev()),
        }
    }

    /// Fail every active stage and drop the sink.
    fn abort(&mut self) {
        for stage in &mut self.stages {
            if stage.engine.state().is_active() {
                let _ = stage.engine.fail();
            }
        }
        self.sink = None;
        self.state = FilterState::Failed;
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            tracing::warn!(error = %err, "filter chain aborted");
            self.abort();
        }
        result
    }

    fn begin(&mut self, direction: Direction, sink: S) -> Result<()> {
        if self.state.is_active() {
            return Err(PdfError::usage("filter chain begin while active"));
        }
        self.sink = Some(sink);
        self.state = match direction {
            Direction::Encode => FilterState::Encoding,
            Direction::Decode => FilterState::Decoding,
        };
        let result = Self::ordered(&mut self.stages, direction).try_for_each(|stage| match direction {
            Direction::Encode => stage.engine.begin_encode(Vec::new()),
            Direction::Decode => stage.engine.begin_decode(Vec::new(), stage.parms.as_ref()),
        });
        self.guard(result)
    }

    fn pump(&mut self, direction: Direction, data: &[u8]) -> Result<()> {
        let mut carry = data.to_vec();
        for stage in Self::ordered(&mut self.stages, direction) {
            match direction {
                Direction::Encode => stage.engine.encode_block(&carry)?,
                Direction::Decode => stage.engine.decode_block(&carry)?,
            }
            carry = stage.engine.take_output();
        }
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| PdfError::usage("filter chain has no sink"))?;
        put(sink, &carry)
    }

    fn finish(&mut self, direction: Direction) -> Result<S> {
        let mut carry = Vec::new();
        for stage in Self::ordered(&mut self.stages, direction) {
            match direction {
                Direction::Encode => {
                    stage.engine.encode_block(&carry)?;
                    carry = stage.engine.end_encode()?;
                }
                Direction::Decode => {
                    stage.engine.decode_block(&carry)?;
                    carry = stage.engine.end_decode()?;
                }
            }
        }
        let mut sink = self
            .sink
            .take()
            .ok_or_else(|| PdfError::usage("filter chain has no sink"))?;
        put(&mut sink, &carry)?;
        sink.flush()?;
        Ok(sink)
    }

    fn expect(&self, direction: Direction, op: &str) -> Result<()> {
        let wanted = match direction {
            Direction::Encode => FilterState::Encoding,
            Direction::Decode => FilterState::Decoding,
        };
        if self.state == wanted {
            Ok(())
        } else {
            Err(PdfError::usage(format!("filter chain {op} while {:?}", self.state)))
        }
    }

    fn block(&mut self, direction: Direction, data: &[u8], op: &str) -> Result<()> {
        self.expect(direction, op)?;
        let result = self.pump(direction, data);
        self.guard(result)
    }

    fn end(&mut self, direction: Direction, op: &str) -> Result<S> {
        self.expect(direction, op)?;
        let result = self.finish(direction);
        let sink = self.guard(result)?;
        self.state = FilterState::Idle;
        Ok(sink)
    }

    pub fn begin_encode(&mut self, sink: S) -> Result<()> {
        self.begin(Direction::Encode, sink)
    }

    pub fn begin_decode(&mut self, sink: S) -> Result<()> {
        self.begin(Direction::Decode, sink)
    }

    pub fn encode_block(&mut self, data: &[u8]) -> Result<()> {
        self.block(Direction::Encode, data, "encode_block")
    }

    pub fn decode_block(&mut self, data: &[u8]) -> Result<()> {
        self.block(Direction::Decode, data, "decode_block")
    }

    pub fn end_encode(&mut self) -> Result<S> {
        self.end(Direction::Encode, "end_encode")
    }

    pub fn end_decode(&mut self) -> Result<S> {
        self.end(Direction::Decode, "end_decode")
    }

    /// Abandon the open session on every stage and return the final sink.
    pub fn fail(&mut self) -> Result<S> {
        if !self.state.is_active() {
            return Err(PdfError::usage(format!("filter chain fail while {:?}", self.state)));
        }
        let sink = self.sink.take();
        self.abort();
        sink.ok_or_else(|| PdfError::usage("filter chain has no sink"))
    }

    pub fn encode_to(&mut self, sink: S, input: &[u8]) -> Result<S> {
        self.begin_encode(sink)?;
        self.encode_block(input)?;
        self.end_encode()
    }

    pub fn decode_to(&mut self, sink: S, input: &[u8]) -> Result<S> {
        self.begin_decode(sink)?;
        self.decode_block(input)?;
        self.end_decode()
    }
}

impl FilterChain<Vec<u8>> {
    pub fn encode(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.encode_to(Vec::new(), input)
    }

    pub fn decode(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.decode_to(Vec::new(), input)
    }
}
