//! Context tree builder
//!
//! Reads a configuration file line by line and builds the tree of nested
//! contexts (`http` -> `server` -> `location` ...). Every statement must
//! fit on one line and end in `;`, `{` or `}`.
//!
//! Contexts live in an arena owned by [`ConfTree`]; parent links and
//! child lists are [`ContextId`] indices into it.

use crate::directive::Directive;
use crate::error::ParseError;
use crate::lexer::{Token, tokenize};
use indexmap::IndexMap;
use tracing::debug;

/// Name of the implicit root context
pub const ROOT_CONTEXT: &str = "http";

/// Index of a context inside its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(usize);

impl ContextId {
    /// The root context of every tree
    pub const ROOT: ContextId = ContextId(0);
}

/// A named block holding directives and nested blocks
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub name: String,
    /// Raw tokens following the name on the opening line
    pub context_args: Vec<String>,
    pub parent: Option<ContextId>,
    /// Directives grouped by name, in order of first appearance
    pub directives: IndexMap<String, Vec<Directive>>,
    /// Child contexts grouped by name, in order of first appearance
    pub children: IndexMap<String, Vec<ContextId>>,
    /// Line the context was opened on (0 for the root)
    pub line: usize,
}

impl Context {
    fn new(name: impl Into<String>, context_args: Vec<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            context_args,
            parent: None,
            directives: IndexMap::new(),
            children: IndexMap::new(),
            line,
        }
    }

    /// Returns the directives recorded under `name`
    pub fn directives_named(&self, name: &str) -> &[Directive] {
        self.directives.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the ids of child contexts named `name`
    pub fn children_named(&self, name: &str) -> &[ContextId] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A parsed configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct ConfTree {
    contexts: Vec<Context>,
}

impl ConfTree {
    fn new() -> Self {
        Self {
            contexts: vec![Context::new(ROOT_CONTEXT, Vec::new(), 0)],
        }
    }

    /// Returns the root `http` context
    pub fn root(&self) -> &Context {
        &self.contexts[ContextId::ROOT.0]
    }

    /// Returns the context with the given id
    pub fn get(&self, id: ContextId) -> &Context {
        &self.contexts[id.0]
    }

    /// Returns the parent of a context, if any
    pub fn parent(&self, id: ContextId) -> Option<&Context> {
        self.get(id).parent.map(|parent| self.get(parent))
    }

    /// Iterates over the children of a context named `name`
    pub fn children<'t>(
        &'t self,
        id: ContextId,
        name: &str,
    ) -> impl Iterator<Item = &'t Context> + 't {
        self.get(id)
            .children_named(name)
            .iter()
            .map(move |&child| self.get(child))
    }

    /// Number of contexts in the tree, root included
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// A tree always holds at least its root
    pub fn is_empty(&self) -> bool {
        false
    }

    fn add_directive(&mut self, id: ContextId, directive: Directive) {
        self.contexts[id.0]
            .directives
            .entry(directive.name.clone())
            .or_default()
            .push(directive);
    }

    fn add_context(&mut self, parent: ContextId, mut child: Context) -> ContextId {
        let id = ContextId(self.contexts.len());
        child.parent = Some(parent);
        let name = child.name.clone();
        self.contexts.push(child);
        self.contexts[parent.0]
            .children
            .entry(name)
            .or_default()
            .push(id);
        id
    }
}

/// Classification of a trimmed, non-empty line by its last character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `... ;`, terminator stripped
    Directive(&'a str),
    /// `... {`, terminator stripped
    OpenContext(&'a str),
    /// `}`
    CloseContext,
}

impl<'a> LineKind<'a> {
    /// Classifies a trimmed line, or returns `None` if it has no known terminator
    pub fn classify(line: &'a str) -> Option<Self> {
        let body = &line[..line.len() - line.chars().next_back()?.len_utf8()];
        match line.chars().next_back()? {
            ';' => Some(LineKind::Directive(body)),
            '{' => Some(LineKind::OpenContext(body)),
            '}' => Some(LineKind::CloseContext),
            _ => None,
        }
    }
}

/// Line-driven state machine building a [`ConfTree`]
#[derive(Debug)]
pub struct TreeBuilder {
    tree: ConfTree,
    current: ContextId,
    line: usize,
}

impl TreeBuilder {
    /// Creates a builder positioned inside the root context
    pub fn new() -> Self {
        debug!("Enter context {}", ROOT_CONTEXT);
        Self {
            tree: ConfTree::new(),
            current: ContextId::ROOT,
            line: 0,
        }
    }

    /// Returns the context currently open
    pub fn current(&self) -> &Context {
        self.tree.get(self.current)
    }

    /// Feeds the next line of input
    pub fn feed_line(&mut self, raw: &str) -> Result<(), ParseError> {
        self.line += 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        match LineKind::classify(line) {
            Some(LineKind::CloseContext) => self.close_context(),
            Some(LineKind::Directive(body)) => {
                let tokens = self.tokenize(body)?;
                let (name, args) = self.split_name(&tokens)?;
                let directive = Directive::new(name.value, args);
                self.tree.add_directive(self.current, directive);
                Ok(())
            }
            Some(LineKind::OpenContext(body)) => {
                let tokens = self.tokenize(body)?;
                let (name, args) = self.split_name(&tokens)?;
                let context_args = args.iter().map(|t| t.raw.to_string()).collect();
                let child = Context::new(name.value, context_args, self.line);
                debug!("Enter context {}", child.name);
                self.current = self.tree.add_context(self.current, child);
                Ok(())
            }
            None => Err(ParseError::UnsupportedLine {
                line: self.line,
                text: line.to_string(),
            }),
        }
    }

    fn tokenize<'l>(&self, body: &'l str) -> Result<Vec<Token<'l>>, ParseError> {
        tokenize(body).map_err(|e| ParseError::Lex(e.on_line(self.line)))
    }

    fn split_name<'t, 'l>(
        &self,
        tokens: &'t [Token<'l>],
    ) -> Result<(&'t Token<'l>, &'t [Token<'l>]), ParseError> {
        tokens
            .split_first()
            .ok_or(ParseError::MissingName { line: self.line })
    }

    fn close_context(&mut self) -> Result<(), ParseError> {
        let context = self.tree.get(self.current);
        match context.parent {
            Some(parent) => {
                debug!("Exit context {}", context.name);
                self.current = parent;
                Ok(())
            }
            None => Err(ParseError::UnbalancedClose { line: self.line }),
        }
    }

    /// Finishes the tree; every opened context must have been closed
    pub fn finish(self) -> Result<ConfTree, ParseError> {
        if self.current != ContextId::ROOT {
            let open = self.tree.get(self.current);
            return Err(ParseError::UnclosedContext {
                context: open.name.clone(),
                line: open.line,
            });
        }
        Ok(self.tree)
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a whole configuration text into a tree
pub fn parse_str(input: &str) -> Result<ConfTree, ParseError> {
    let mut builder = TreeBuilder::new();
    for line in input.lines() {
        builder.feed_line(line)?;
    }
    builder.finish()
}
