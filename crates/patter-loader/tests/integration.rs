//! Integration tests for script loading: the lifecycle invariants and
//! the end-to-end scenarios.

use std::any::Any;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use patter_core::log::ErrorKind;
use patter_lang::defaults::Number;
use patter_lang::pattern::ParseResult;
use patter_lang::syntax::SyntaxElement;
use patter_lang::{
    Addon, Conditional, ConditionalMode, DummyContext, Effect, Engine, EventBus, Expression,
    Registration, ScriptEvent, Statement, TriggerContext,
};
use patter_loader::{LoadOptions, ScriptLoader};

struct TestAddon;

impl Addon for TestAddon {
    fn name(&self) -> &str {
        "test"
    }
}

#[derive(Default)]
struct SetEffect {
    target: Option<Box<dyn Expression>>,
    value: Option<Box<dyn Expression>>,
    next: Option<Box<dyn Statement>>,
}

impl SetEffect {
    fn target(&self) -> &dyn Expression {
        self.target.as_deref().expect("initialized")
    }

    fn value(&self) -> &dyn Expression {
        self.value.as_deref().expect("initialized")
    }
}

impl SyntaxElement for SetEffect {
    fn init(
        &mut self,
        mut expressions: Vec<Box<dyn Expression>>,
        _pattern_index: usize,
        _result: &ParseResult,
    ) -> bool {
        if expressions.len() != 2 {
            return false;
        }
        self.value = expressions.pop();
        self.target = expressions.pop();
        true
    }

    fn describe(&self, ctx: Option<&dyn TriggerContext>, debug: bool) -> String {
        format!(
            "set {} to {}",
            self.target().describe(ctx, debug),
            self.value().describe(ctx, debug)
        )
    }
}

impl Statement for SetEffect {
    fn set_next(&mut self, next: Option<Box<dyn Statement>>) {
        self.next = next;
    }

    fn next(&self) -> Option<&dyn Statement> {
        self.next.as_deref()
    }
}

impl Effect for SetEffect {
    fn execute(&self, _ctx: &dyn TriggerContext) -> bool {
        true
    }
}

/// Records the order in which its instances are parsed; used to observe
/// trigger finalization order.
struct MarkEffect {
    order: Arc<Mutex<Vec<String>>>,
    next: Option<Box<dyn Statement>>,
}

impl SyntaxElement for MarkEffect {
    fn init(
        &mut self,
        expressions: Vec<Box<dyn Expression>>,
        _pattern_index: usize,
        _result: &ParseResult,
    ) -> bool {
        let value = expressions[0]
            .single_value(&DummyContext)
            .expect("mark value");
        let label = value
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_else(|| "?".to_string());
        self.order.lock().unwrap().push(label);
        true
    }

    fn describe(&self, _ctx: Option<&dyn TriggerContext>, _debug: bool) -> String {
        "mark".to_string()
    }
}

impl Statement for MarkEffect {
    fn set_next(&mut self, next: Option<Box<dyn Statement>>) {
        self.next = next;
    }

    fn next(&self) -> Option<&dyn Statement> {
        self.next.as_deref()
    }
}

impl Effect for MarkEffect {
    fn execute(&self, _ctx: &dyn TriggerContext) -> bool {
        true
    }
}

struct LoadEvent {
    unloads: Arc<AtomicUsize>,
}

impl SyntaxElement for LoadEvent {
    fn on_unload(&self) {
        self.unloads.fetch_add(1, Ordering::SeqCst);
    }

    fn describe(&self, _ctx: Option<&dyn TriggerContext>, _debug: bool) -> String {
        "on load".to_string()
    }
}

impl ScriptEvent for LoadEvent {
    fn check(&self, ctx: &dyn TriggerContext) -> bool {
        ctx.name() == "load"
    }

    fn bus_key(&self) -> &str {
        "load"
    }
}

#[derive(Default)]
struct EarlyEvent;

impl SyntaxElement for EarlyEvent {
    fn describe(&self, _ctx: Option<&dyn TriggerContext>, _debug: bool) -> String {
        "on early".to_string()
    }
}

impl ScriptEvent for EarlyEvent {
    fn check(&self, ctx: &dyn TriggerContext) -> bool {
        ctx.name() == "early"
    }

    fn bus_key(&self) -> &str {
        "early"
    }

    fn loading_priority(&self) -> i32 {
        10
    }
}

#[derive(Default)]
struct LateEvent;

impl SyntaxElement for LateEvent {
    fn describe(&self, _ctx: Option<&dyn TriggerContext>, _debug: bool) -> String {
        "on late".to_string()
    }
}

impl ScriptEvent for LateEvent {
    fn check(&self, ctx: &dyn TriggerContext) -> bool {
        ctx.name() == "late"
    }

    fn bus_key(&self) -> &str {
        "late"
    }

    fn loading_priority(&self) -> i32 {
        1
    }
}

struct Fixture {
    loader: ScriptLoader,
    unloads: Arc<AtomicUsize>,
    order: Arc<Mutex<Vec<String>>>,
}

fn fixture() -> Fixture {
    let mut engine = Engine::new();
    let unloads = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut registration = Registration::new(&mut engine, TestAddon);
    registration
        .new_effect::<SetEffect>(&["set %object% to %objects%"], 0)
        .register();
    let order_capture = Arc::clone(&order);
    registration
        .new_effect_with::<MarkEffect, _>(&["mark %object%"], 0, move || MarkEffect {
            order: Arc::clone(&order_capture),
            next: None,
        })
        .register();
    let unload_capture = Arc::clone(&unloads);
    registration
        .new_event_with::<LoadEvent, _>(&["on load"], 0, &["load"], move || LoadEvent {
            unloads: Arc::clone(&unload_capture),
        })
        .register();
    registration
        .new_event::<EarlyEvent>(&["on early"], 0, &["load"])
        .register();
    registration
        .new_event::<LateEvent>(&["on late"], 0, &["load"])
        .register();
    let entries = registration.finish();
    assert!(entries.is_empty(), "fixture registration failed: {:?}", entries);

    Fixture {
        loader: ScriptLoader::new(Arc::new(engine), Arc::new(EventBus::new())),
        unloads,
        order,
    }
}

fn write_script(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("patter_loader_tests");
    std::fs::create_dir_all(&dir).expect("create fixture dir");
    let path = dir.join(format!("{}_{}.ptr", name, std::process::id()));
    std::fs::write(&path, content).expect("write fixture script");
    path
}

fn downcast<'a, T: Any>(statement: &'a dyn Statement) -> &'a T {
    let any: &dyn Any = statement;
    any.downcast_ref::<T>().expect("statement type")
}

#[test]
fn code_outside_a_trigger_is_a_structure_error() {
    let fixture = fixture();
    let path = write_script("s1", "set {x} to 5\n");
    let result = fixture.loader.get_or_load_script(&path, LoadOptions::new());

    let script = result.script().expect("script registered");
    assert!(script.is_loaded());
    assert!(script.triggers().unwrap().is_empty());

    let errors = result.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), Some(ErrorKind::StructureError));
    assert_eq!(errors[0].message(), "Can't have code outside of a trigger");
    assert_eq!(errors[0].line(), 1);
}

#[test]
fn single_trigger_with_one_effect() {
    let fixture = fixture();
    let path = write_script("s2", "on load:\n\tset {x} to 5\n");
    let result = fixture.loader.get_or_load_script(&path, LoadOptions::new());
    assert!(result.errors().is_empty());

    let script = result.script().unwrap();
    let triggers = script.triggers().unwrap();
    assert_eq!(triggers.len(), 1);

    let head = triggers[0].first().expect("statement chain");
    let effect = downcast::<SetEffect>(head);
    assert_eq!(effect.target().describe(None, false), "{x}");
    let value = effect.value().single_value(&DummyContext).unwrap();
    assert_eq!(value.downcast_ref::<Number>(), Some(&Number::Integer(5)));
    assert!(head.next().is_none());
}

#[test]
fn list_literal_capture() {
    let fixture = fixture();
    let path = write_script("s3", "on load:\n\tset {x} to 1, 2 and 3\n");
    let result = fixture.loader.get_or_load_script(&path, LoadOptions::new());
    assert!(result.errors().is_empty());

    let triggers = result.script().unwrap().triggers().unwrap();
    let effect = downcast::<SetEffect>(triggers[0].first().unwrap());
    let any: &dyn Any = effect.value();
    let list = any
        .downcast_ref::<patter_lang::base::LiteralList>()
        .expect("literal list");
    assert!(list.is_and_list());
    let numbers: Vec<_> = list
        .items()
        .iter()
        .map(|item| {
            *item
                .single_value(&DummyContext)
                .unwrap()
                .downcast_ref::<Number>()
                .unwrap()
        })
        .collect();
    assert_eq!(
        numbers,
        vec![Number::Integer(1), Number::Integer(2), Number::Integer(3)]
    );
}

#[test]
fn conditional_chain_in_trigger() {
    let fixture = fixture();
    let path = write_script(
        "s4",
        "on load:\n\tif true:\n\t\tset {x} to 1\n\telse:\n\t\tset {x} to 2\n",
    );
    let result = fixture.loader.get_or_load_script(&path, LoadOptions::new());
    assert!(result.errors().is_empty());

    let triggers = result.script().unwrap().triggers().unwrap();
    let conditional = downcast::<Conditional>(triggers[0].first().unwrap());
    assert_eq!(conditional.mode(), ConditionalMode::If);
    downcast::<SetEffect>(conditional.first().unwrap());

    let falling = conditional.falling_clause().expect("else clause");
    assert_eq!(falling.mode(), ConditionalMode::Else);
    downcast::<SetEffect>(falling.first().unwrap());
}

#[test]
fn top_level_else_is_a_structure_error() {
    let fixture = fixture();
    let path = write_script("s5", "on load:\n\tset {x} to 5\nelse:\n\tset {x} to 6\n");
    let result = fixture.loader.get_or_load_script(&path, LoadOptions::new());

    let triggers = result.script().unwrap().triggers().unwrap();
    assert_eq!(triggers.len(), 1);

    let errors = result.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), Some(ErrorKind::StructureError));
    assert_eq!(
        errors[0].message(),
        "An 'else' must be placed after an 'if' or an 'else if'"
    );
    assert_eq!(errors[0].line(), 3);
}

#[test]
fn reload_preserves_identity_and_unloads_old_triggers() {
    let fixture = fixture();
    let path = write_script("s6", "on load:\n\tset {x} to 1\non load:\n\tset {y} to 2\n");
    let result = fixture.loader.get_or_load_script(&path, LoadOptions::new());
    let script = Arc::clone(result.script().unwrap());
    assert_eq!(script.triggers().unwrap().len(), 2);

    std::fs::write(&path, "on load:\n\tset {z} to 3\n").unwrap();
    let reloaded = fixture.loader.reload(&script, LoadOptions::new());

    assert_eq!(fixture.unloads.load(Ordering::SeqCst), 2);
    let reloaded_script = reloaded.script().unwrap();
    assert!(Arc::ptr_eq(&script, reloaded_script));
    assert_eq!(script.triggers().unwrap().len(), 1);
}

#[test]
fn lifecycle_invariant() {
    let fixture = fixture();
    let path = write_script("lifecycle", "on load:\n\tset {x} to 1\n");
    let result = fixture.loader.get_or_load_script(&path, LoadOptions::new());
    let script = Arc::clone(result.script().unwrap());

    assert!(script.is_loaded());
    assert!(script.triggers().is_some());

    script.unload();
    assert!(!script.is_loaded());
    assert!(script.triggers().is_none());

    let reloaded = fixture.loader.get_or_load_script(&path, LoadOptions::new());
    assert!(Arc::ptr_eq(&script, reloaded.script().unwrap()));
    assert!(script.is_loaded());

    script.unload();
    assert!(!script.is_loaded());
}

#[test]
fn registry_returns_same_script_identity() {
    let fixture = fixture();
    let path = write_script("identity", "on load:\n\tset {x} to 1\n");
    let first = fixture.loader.get_or_load_script(&path, LoadOptions::new());
    let second = fixture.loader.get_or_load_script(&path, LoadOptions::new());
    assert!(Arc::ptr_eq(
        first.script().unwrap(),
        second.script().unwrap()
    ));
    // The second call found the loaded script; nothing was parsed.
    assert!(second.log().is_none());
}

#[test]
fn concurrent_loads_of_one_path_load_once() {
    let fixture = fixture();
    let path = write_script("concurrent", "on load:\n\tset {x} to 1\n");

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let loader = &fixture.loader;
                let path = &path;
                scope.spawn(move || {
                    let result = loader.get_or_load_script(path, LoadOptions::new());
                    Arc::clone(result.script().expect("loaded"))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for script in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], script));
    }
    assert_eq!(results[0].triggers().unwrap().len(), 1);
}

#[test]
fn triggers_finalize_in_loading_priority_order() {
    let fixture = fixture();
    // Source order is late first; the early event's higher loading
    // priority must win.
    let path = write_script(
        "priority",
        "on late:\n\tmark \"late\"\non early:\n\tmark \"early\"\n",
    );
    let result = fixture.loader.get_or_load_script(&path, LoadOptions::new());
    assert!(result.errors().is_empty());
    assert_eq!(
        *fixture.order.lock().unwrap(),
        vec!["early".to_string(), "late".to_string()]
    );
}

#[test]
fn equal_priority_preserves_source_order() {
    let fixture = fixture();
    let path = write_script(
        "priority_tie",
        "on early:\n\tmark \"a\"\non early:\n\tmark \"b\"\n",
    );
    let result = fixture.loader.get_or_load_script(&path, LoadOptions::new());
    assert!(result.errors().is_empty());
    assert_eq!(
        *fixture.order.lock().unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );
}

#[test]
fn loaded_triggers_register_with_the_bus() {
    let fixture = fixture();
    let path = write_script("bus", "on load:\n\tset {x} to 1\n");
    fixture.loader.get_or_load_script(&path, LoadOptions::new());
    assert_eq!(fixture.loader.bus().handler_count("load"), 1);
}

#[test]
fn dry_load_skips_bus_registration() {
    let fixture = fixture();
    let path = write_script("dry", "on load:\n\tset {x} to 1\n");
    let result = fixture
        .loader
        .get_or_load_script(&path, LoadOptions::new().with_dry());
    assert!(result.script().unwrap().is_loaded());
    assert_eq!(fixture.loader.bus().handler_count("load"), 0);
}

#[test]
fn missing_file_fails_with_log() {
    let fixture = fixture();
    let path = std::env::temp_dir().join("patter_loader_tests/does_not_exist.ptr");
    let result = fixture.loader.get_or_load_script(&path, LoadOptions::new());
    assert!(!result.parsed_successfully());
    assert!(result
        .errors()
        .iter()
        .any(|e| e.kind() == Some(ErrorKind::Exception)));
}

#[test]
fn remove_script_unloads_and_forgets() {
    let fixture = fixture();
    let path = write_script("remove", "on load:\n\tset {x} to 1\n");
    fixture.loader.get_or_load_script(&path, LoadOptions::new());

    let removed = fixture.loader.remove_script(&path).expect("was registered");
    assert!(!removed.is_loaded());
    assert_eq!(fixture.unloads.load(Ordering::SeqCst), 1);
    assert!(fixture.loader.get_script(&path).is_none());
}

#[test]
fn script_name_strips_one_extension() {
    let fixture = fixture();
    let path = write_script("named", "on load:\n\tset {x} to 1\n");
    let result = fixture.loader.get_or_load_script(&path, LoadOptions::new());
    let script = result.script().unwrap();
    assert_eq!(script.name(), format!("named_{}", std::process::id()));
}
