//! Tests for the end-to-end locator, driven by scripted debugger sessions

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use symsrc_core::cache::{CacheEntry, ExtractionCache};
use symsrc_core::config::{Backend, LocatorConfig};
use symsrc_core::error::{LocatorError, LocatorResult};
use symsrc_core::extract::{LexicalExtractor, Span, SpanExtractor};
use symsrc_core::locator::FunctionLocator;
use symsrc_core::resolver::{DebuggerResolver, SymbolResolver};
use symsrc_core::session::{CommandSet, DebuggerSession, SessionFactory, SessionReply};
use symsrc_core::source::MemorySourceProvider;

const TIMEOUT: Duration = Duration::from_millis(50);

const ADD_SOURCE: &str = "#include \"add.h\"\n\nint add(int a,\n  int b) {\n  return a + b;\n}\n";

/// Replies keyed by command; unknown commands answer like gdb does.
#[derive(Clone, Default)]
struct Script
{
    replies: HashMap<String, SessionReply>,
}

impl Script
{
    fn reply(mut self, command: &str, reply: SessionReply) -> Self
    {
        self.replies.insert(command.to_string(), reply);
        self
    }

    fn add() -> Self
    {
        Self::default()
            .reply(
                "info address add",
                SessionReply::complete("Symbol \"add\" is a function at address 0x1139."),
            )
            .reply(
                "info line add",
                SessionReply::complete("Line 3 of \"add.c\" starts at address 0x1139 <add> and ends at 0x1141 <add+8>."),
            )
            .reply("info symbol add", SessionReply::complete("add in section .text"))
    }
}

#[derive(Default)]
struct Counters
{
    sends: AtomicUsize,
    starts: AtomicUsize,
    closes: AtomicUsize,
}

struct ScriptedSession
{
    script: Script,
    commands: CommandSet,
    counters: Arc<Counters>,
    closed: bool,
}

impl DebuggerSession for ScriptedSession
{
    fn commands(&self) -> &CommandSet
    {
        &self.commands
    }

    fn send(&mut self, command: &str, _timeout: Duration) -> SessionReply
    {
        self.counters.sends.fetch_add(1, Ordering::SeqCst);
        if self.closed {
            return SessionReply::closed();
        }
        self.script.replies.get(command).cloned().unwrap_or_else(|| {
            let symbol = command.rsplit(' ').next().unwrap_or_default();
            SessionReply::complete(format!("No symbol \"{symbol}\" in current context."))
        })
    }

    fn close(&mut self)
    {
        if !self.closed {
            self.closed = true;
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_closed(&self) -> bool
    {
        self.closed
    }
}

/// Hands out one script per start; the last script repeats.
struct ScriptedFactory
{
    scripts: Vec<Script>,
    counters: Arc<Counters>,
}

impl ScriptedFactory
{
    fn new(scripts: Vec<Script>) -> (Arc<Self>, Arc<Counters>)
    {
        let counters = Arc::new(Counters::default());
        let factory = Arc::new(Self {
            scripts,
            counters: Arc::clone(&counters),
        });
        (factory, counters)
    }
}

impl SessionFactory for ScriptedFactory
{
    fn start(&self) -> LocatorResult<Box<dyn DebuggerSession>>
    {
        let index = self.counters.starts.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.get(index).or_else(|| self.scripts.last()).cloned().unwrap_or_default();
        Ok(Box::new(ScriptedSession {
            script,
            commands: CommandSet::gdb(),
            counters: Arc::clone(&self.counters),
            closed: false,
        }))
    }
}

struct FailingFactory;

impl SessionFactory for FailingFactory
{
    fn start(&self) -> LocatorResult<Box<dyn DebuggerSession>>
    {
        Err(LocatorError::ProcessStart {
            primary: "ntox86_64-gdb".to_string(),
            fallback: "gdb".to_string(),
            reason: "No such file or directory".to_string(),
        })
    }
}

/// Extractor that records whether it ran.
struct CountingExtractor
{
    calls: Arc<AtomicUsize>,
}

impl SpanExtractor for CountingExtractor
{
    fn label(&self) -> &'static str
    {
        "counting"
    }

    fn find_span(&self, source: &str, start_line: usize) -> Option<Span>
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        LexicalExtractor::new().find_span(source, start_line)
    }
}

fn locator(factory: Arc<dyn SessionFactory>, sources: MemorySourceProvider) -> FunctionLocator
{
    let resolver = DebuggerResolver::new(factory, TIMEOUT).unwrap();
    FunctionLocator::new(
        Box::new(resolver),
        Box::new(LexicalExtractor::new()),
        Arc::new(sources),
        Arc::new(ExtractionCache::new()),
    )
}

#[test]
fn test_locate_function()
{
    let (factory, _) = ScriptedFactory::new(vec![Script::add()]);
    let mut locator = locator(factory, MemorySourceProvider::new().with_file("add.c", ADD_SOURCE));

    let result = locator.locate("add").unwrap().unwrap();
    assert_eq!(result.text, "int add(int a,\n  int b) {\n  return a + b;\n}");
    assert_eq!((result.start_line, result.end_line), (3, 6));
    assert!(result.complete);
    assert_eq!(result.signature(), "int add(int a, int b)");
}

#[test]
fn test_unparseable_output_never_reaches_extractor()
{
    let (factory, counters) = ScriptedFactory::new(vec![Script::default()]);
    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = DebuggerResolver::new(factory, TIMEOUT).unwrap();
    let mut locator = FunctionLocator::new(
        Box::new(resolver),
        Box::new(CountingExtractor {
            calls: Arc::clone(&calls),
        }),
        Arc::new(MemorySourceProvider::new().with_file("add.c", ADD_SOURCE)),
        Arc::new(ExtractionCache::new()),
    );

    assert!(locator.locate("ghost").unwrap().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    // First attempt, then exactly one retry on a fresh session
    assert_eq!(counters.starts.load(Ordering::SeqCst), 2);
    assert_eq!(locator.cache().get("ghost"), Some(CacheEntry::NotFound));
}

#[test]
fn test_second_lookup_is_served_from_cache()
{
    let (factory, counters) = ScriptedFactory::new(vec![Script::add()]);
    let sources = Arc::new(MemorySourceProvider::new().with_file("add.c", ADD_SOURCE));
    let resolver = DebuggerResolver::new(factory, TIMEOUT).unwrap();
    let mut locator = FunctionLocator::new(
        Box::new(resolver),
        Box::new(LexicalExtractor::new()),
        Arc::clone(&sources) as Arc<dyn symsrc_core::source::SourceProvider>,
        Arc::new(ExtractionCache::new()),
    );

    let first = locator.locate("add").unwrap();
    let sends = counters.sends.load(Ordering::SeqCst);
    let second = locator.locate("add").unwrap();

    assert_eq!(first, second);
    assert_eq!(counters.sends.load(Ordering::SeqCst), sends);
    assert_eq!(sources.loads(), 1);
}

#[test]
fn test_not_found_is_cached_too()
{
    let (factory, counters) = ScriptedFactory::new(vec![Script::default()]);
    let mut locator = locator(factory, MemorySourceProvider::new());

    assert!(locator.locate("ghost").unwrap().is_none());
    let sends = counters.sends.load(Ordering::SeqCst);
    assert!(locator.locate("ghost").unwrap().is_none());
    assert_eq!(counters.sends.load(Ordering::SeqCst), sends);
}

#[test]
fn test_timeout_retries_on_fresh_session()
{
    let wedged = Script::default().reply("info address add", SessionReply::timed_out("Symbol \"add\" is"));
    let (factory, counters) = ScriptedFactory::new(vec![wedged, Script::add()]);
    let mut locator = locator(factory, MemorySourceProvider::new().with_file("add.c", ADD_SOURCE));

    let result = locator.locate("add").unwrap().unwrap();
    assert!(result.complete);
    assert_eq!(counters.starts.load(Ordering::SeqCst), 2);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    // The timed-out attempt stops after its first command
    assert_eq!(counters.sends.load(Ordering::SeqCst), 1 + 3);
}

#[test]
fn test_session_is_reused_between_symbols()
{
    let script = Script::add()
        .reply("info address sub", SessionReply::complete("Symbol \"sub\" is a function at address 0x1150."))
        .reply("info line sub", SessionReply::complete("Line 8 of \"add.c\" starts at address 0x1150 <sub>."));
    let (factory, counters) = ScriptedFactory::new(vec![script]);
    let source = format!("{ADD_SOURCE}\nint sub(int a, int b)\n{{\n  return a - b;\n}}\n");
    let mut locator = locator(factory, MemorySourceProvider::new().with_file("add.c", source));

    assert!(locator.locate("add").unwrap().is_some());
    let sub = locator.locate("sub").unwrap().unwrap();
    assert_eq!(sub.text, "int sub(int a, int b)\n{\n  return a - b;\n}");
    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_address_without_line_is_not_extracted()
{
    let stripped = Script::default().reply(
        "info address memset",
        SessionReply::complete("Symbol \"memset\" is at 0x2040 in a file compiled without debugging."),
    );
    let (factory, _) = ScriptedFactory::new(vec![stripped]);
    let mut resolver = DebuggerResolver::new(factory.clone(), TIMEOUT).unwrap();

    let location = resolver.resolve("memset").unwrap().unwrap();
    assert_eq!(location.address.as_deref(), Some("0x2040"));
    assert!(!location.has_source());

    let mut locator = locator(factory, MemorySourceProvider::new());
    assert!(locator.locate("memset").unwrap().is_none());
}

#[test]
fn test_missing_source_is_not_found()
{
    let (factory, _) = ScriptedFactory::new(vec![Script::add()]);
    let mut locator = locator(factory, MemorySourceProvider::new());
    assert!(locator.locate("add").unwrap().is_none());
    assert!(locator.cache().contains("add"));
}

#[test]
fn test_process_start_failure_is_an_error_and_not_cached()
{
    let mut locator = locator(Arc::new(FailingFactory), MemorySourceProvider::new());

    let err = locator.locate("add").unwrap_err();
    assert!(err.is_process_start());
    assert!(err.to_string().contains("ntox86_64-gdb"));
    assert!(!locator.cache().contains("add"));
}

#[test]
fn test_shared_cache_between_locators()
{
    let cache = Arc::new(ExtractionCache::new());
    let (factory, counters) = ScriptedFactory::new(vec![Script::add()]);
    let sources = Arc::new(MemorySourceProvider::new().with_file("add.c", ADD_SOURCE));

    let build = |factory: Arc<ScriptedFactory>| {
        FunctionLocator::new(
            Box::new(DebuggerResolver::new(factory, TIMEOUT).unwrap()),
            Box::new(LexicalExtractor::new()),
            Arc::clone(&sources) as Arc<dyn symsrc_core::source::SourceProvider>,
            Arc::clone(&cache),
        )
    };

    let mut first = build(Arc::clone(&factory));
    let mut second = build(factory);
    let a = first.locate("add").unwrap();
    let b = second.locate("add").unwrap();

    assert_eq!(a, b);
    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_regex_fallback_with_relative_source_root()
{
    let dir = tempfile::tempdir_in(".").unwrap();
    std::fs::create_dir_all(dir.path().join("musl/src")).unwrap();
    std::fs::write(dir.path().join("musl/src/add.c"), "int add(int a, int b) {\n  return a + b;\n}\n").unwrap();
    let cwd = std::env::current_dir().unwrap();
    let root = dir.path().strip_prefix(&cwd).unwrap().join("musl");

    let mut config = LocatorConfig {
        backend: Backend::RegexFallback,
        ..LocatorConfig::default()
    };
    config.sources.root = Some(root);

    let mut locator = FunctionLocator::from_config(&config, Arc::new(ExtractionCache::new())).unwrap();
    let result = locator.locate("add").unwrap().unwrap();
    assert_eq!(result.text, "int add(int a, int b) {\n  return a + b;\n}");
    assert_eq!(result.source_file, format!("src{}add.c", std::path::MAIN_SEPARATOR));
}
