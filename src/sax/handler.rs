//! Callback trait connecting the parser to a tree builder.

use crate::error::Result;
use crate::span::TagPosition;

/// Source context passed to every structural callback.
#[derive(Debug, Clone, Copy)]
pub struct EventContext {
    /// Delimiter spans of the token that triggered the callback, when the
    /// feed history is deep enough to know them.
    pub location: Option<TagPosition>,
    /// 1-based line number at the callback point.
    pub line: u32,
    /// 1-based byte column at the callback point.
    pub column: u32,
}

/// An attribute as read from a start tag: the raw qualified name and the
/// entity-decoded value. Namespace resolution happens downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    pub value: String,
}

/// Receiver of parse events.
///
/// Implementations own tree shape. Callbacks the tree does not represent
/// (processing instructions, DOCTYPE) default to no-ops so a builder only
/// implements what it stores.
pub trait SaxHandler {
    /// A start tag (or the open half of a self-closing tag) completed.
    fn element_start(
        &mut self,
        name: &str,
        attributes: &[RawAttribute],
        ctx: &EventContext,
    ) -> Result<()>;

    /// An end tag (or the close half of a self-closing tag) completed.
    /// For self-closing syntax this fires immediately after `element_start`
    /// with an identical context, so both stamped positions coincide.
    fn element_end(&mut self, name: &str, ctx: &EventContext) -> Result<()>;

    /// Character data. May be delivered in several consecutive pieces;
    /// receivers concatenate before attaching.
    fn text(&mut self, data: &str) -> Result<()>;

    /// A complete comment, content without the `<!--`/`-->` markers.
    fn comment(&mut self, text: &str, ctx: &EventContext) -> Result<()> {
        let _ = (text, ctx);
        Ok(())
    }

    /// A processing instruction other than the XML declaration.
    fn processing_instruction(&mut self, target: &str, data: &str, ctx: &EventContext) -> Result<()> {
        let _ = (target, data, ctx);
        Ok(())
    }

    /// A flat DOCTYPE declaration (internal subsets are unsupported).
    fn doctype(&mut self, content: &str, ctx: &EventContext) -> Result<()> {
        let _ = (content, ctx);
        Ok(())
    }
}
