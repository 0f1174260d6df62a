//! Scripted host runtime for exercising the boundary without an editor
//!
//! Design: a small object arena behind `RefCell`, plus just enough of the
//! host's function catalog (`list`, `record`, `aref`, `length`,
//! `defalias`, the type predicates) for the marshaling paths to run end
//! to end. Symbols are interned into one table so identity comparison
//! behaves like the real host's.
//!
//! The mock is strict about the exit protocol: any host entry made while
//! an exit is pending panics the test, except `non_local_exit_check`
//! itself. Failure injection covers the interesting host behaviors:
//! poisoned symbols that signal on intern or funcall, refused function
//! objects, misreported string sizes, copy failures, and thrown
//! (non-error) exits.
//!
//! This type exists for tests and lives on panics by contract; it is not
//! part of the boundary layer proper.

use core::ffi::c_void;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::env::Env;
use crate::host::{ExitStatus, FunctionSpec, HostRuntime, HostValue};

/// One object in the mock arena
#[derive(Debug, Clone)]
enum Obj {
    Symbol(String),
    Integer(i64),
    Str(Vec<u8>),
    Buffer(String),
    Record(Vec<usize>),
    List(Vec<usize>),
    Function(FunctionSpec),
}

/// Decoded view of an arena object, for test assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    Symbol(String),
    Integer(i64),
    Str(Vec<u8>),
    Buffer(String),
    Record(Vec<Snapshot>),
    List(Vec<Snapshot>),
    Function,
}

/// Injected host misbehavior
#[derive(Debug, Default)]
struct Poison {
    intern: HashSet<String>,
    funcall: HashSet<String>,
    throw_on: HashSet<String>,
    make_function: bool,
    global_ref: bool,
    size_query: Option<usize>,
    copy_size: Option<usize>,
    copy_fail: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingState {
    status: ExitStatus,
    condition: usize,
    payload: usize,
}

#[derive(Debug, Default)]
struct State {
    arena: Vec<Obj>,
    symbols: HashMap<String, usize>,
    fixnums: HashMap<i64, usize>,
    aliases: HashMap<String, usize>,
    globals: Vec<usize>,
    pending: Option<PendingState>,
    calls: usize,
    poison: Poison,
}

#[inline]
fn handle(index: usize) -> HostValue {
    // Handles are arena indices shifted by one so none is ever null
    HostValue::from_raw((index + 1) as *mut c_void)
}

impl State {
    /// Ledger and discipline check at every host entry
    fn enter(&mut self, label: &'static str) {
        self.calls += 1;
        if self.pending.is_some() {
            panic!("host entry `{}` called while a non-local exit is pending", label);
        }
    }

    fn index(&self, value: HostValue) -> usize {
        let raw = value.as_raw() as usize;
        assert!(raw != 0, "null host handle in mock");
        let index = raw - 1;
        assert!(index < self.arena.len(), "dangling host handle in mock");
        index
    }

    fn alloc(&mut self, obj: Obj) -> usize {
        self.arena.push(obj);
        self.arena.len() - 1
    }

    fn intern_raw(&mut self, name: &str) -> usize {
        if let Some(&index) = self.symbols.get(name) {
            return index;
        }
        let index = self.alloc(Obj::Symbol(name.to_string()));
        self.symbols.insert(name.to_string(), index);
        index
    }

    /// Small integers are interned like host fixnums
    fn alloc_integer(&mut self, value: i64) -> usize {
        if !(0..=255).contains(&value) {
            return self.alloc(Obj::Integer(value));
        }
        if let Some(&index) = self.fixnums.get(&value) {
            return index;
        }
        let index = self.alloc(Obj::Integer(value));
        self.fixnums.insert(value, index);
        index
    }

    fn verdict(&mut self, matched: bool) -> usize {
        self.intern_raw(if matched { "t" } else { "nil" })
    }

    fn signal_raw(&mut self, condition: &str, items: &[usize]) {
        let payload = self.alloc(Obj::List(items.to_vec()));
        let condition = self.intern_raw(condition);
        self.pending = Some(PendingState {
            status: ExitStatus::Signaled,
            condition,
            payload,
        });
    }

    fn throw_raw(&mut self, tag: &str) {
        let condition = self.intern_raw(tag);
        let payload = self.intern_raw("nil");
        self.pending = Some(PendingState {
            status: ExitStatus::Thrown,
            condition,
            payload,
        });
    }

    fn dispatch(&mut self, name: &str, args: &[usize]) -> usize {
        match name {
            "list" => self.alloc(Obj::List(args.to_vec())),
            "record" => self.alloc(Obj::Record(args.to_vec())),
            "aref" => self.aref(args),
            "length" => self.length_of(args),
            "defalias" => self.defalias(args),
            "stringp" => {
                let hit = matches!(self.arena[args[0]], Obj::Str(_));
                self.verdict(hit)
            }
            "integerp" => {
                let hit = matches!(self.arena[args[0]], Obj::Integer(_));
                self.verdict(hit)
            }
            "bufferp" => {
                let hit = matches!(self.arena[args[0]], Obj::Buffer(_));
                self.verdict(hit)
            }
            "recordp" => {
                let hit = matches!(self.arena[args[0]], Obj::Record(_));
                self.verdict(hit)
            }
            _ => {
                self.signal_raw("void-function", args);
                self.intern_raw("nil")
            }
        }
    }

    fn aref(&mut self, args: &[usize]) -> usize {
        let at = match self.arena[args[1]] {
            Obj::Integer(value) => value,
            _ => {
                self.signal_raw("wrong-type-argument", &[args[1]]);
                return self.intern_raw("nil");
            }
        };
        let slots = match self.arena[args[0]] {
            Obj::Record(ref slots) | Obj::List(ref slots) => slots.clone(),
            _ => {
                self.signal_raw("wrong-type-argument", &[args[0]]);
                return self.intern_raw("nil");
            }
        };
        match usize::try_from(at).ok().and_then(|i| slots.get(i).copied()) {
            Some(slot) => slot,
            None => {
                self.signal_raw("args-out-of-range", args);
                self.intern_raw("nil")
            }
        }
    }

    fn length_of(&mut self, args: &[usize]) -> usize {
        let length = match self.arena[args[0]] {
            Obj::Record(ref slots) | Obj::List(ref slots) => slots.len(),
            Obj::Str(ref bytes) => bytes.len(),
            _ => {
                self.signal_raw("wrong-type-argument", &[args[0]]);
                return self.intern_raw("nil");
            }
        };
        self.alloc_integer(length as i64)
    }

    fn defalias(&mut self, args: &[usize]) -> usize {
        let name = match self.arena[args[0]] {
            Obj::Symbol(ref name) => name.clone(),
            _ => {
                self.signal_raw("wrong-type-argument", &[args[0]]);
                return self.intern_raw("nil");
            }
        };
        self.aliases.insert(name, args[1]);
        args[0]
    }

    fn snap(&self, index: usize) -> Snapshot {
        match self.arena[index] {
            Obj::Symbol(ref name) => Snapshot::Symbol(name.clone()),
            Obj::Integer(value) => Snapshot::Integer(value),
            Obj::Str(ref bytes) => Snapshot::Str(bytes.clone()),
            Obj::Buffer(ref name) => Snapshot::Buffer(name.clone()),
            Obj::Record(ref slots) => {
                Snapshot::Record(slots.iter().map(|&slot| self.snap(slot)).collect())
            }
            Obj::List(ref items) => {
                Snapshot::List(items.iter().map(|&item| self.snap(item)).collect())
            }
            Obj::Function(_) => Snapshot::Function,
        }
    }
}

/// Scripted, strict host runtime
pub struct MockHost {
    state: RefCell<State>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::default()),
        }
    }

    // ----- seeding: build fixtures without touching the call ledger -----

    /// Seed a string object from raw bytes
    pub fn seed_bytes(&self, bytes: &[u8]) -> HostValue {
        handle(self.state.borrow_mut().alloc(Obj::Str(bytes.to_vec())))
    }

    /// Seed a string object from text
    pub fn seed_string(&self, text: &str) -> HostValue {
        self.seed_bytes(text.as_bytes())
    }

    /// Seed an integer object
    pub fn seed_integer(&self, value: i64) -> HostValue {
        handle(self.state.borrow_mut().alloc_integer(value))
    }

    /// Seed a named buffer object
    pub fn seed_buffer(&self, name: &str) -> HostValue {
        handle(self.state.borrow_mut().alloc(Obj::Buffer(name.to_string())))
    }

    /// Seed (intern) a symbol
    pub fn seed_symbol(&self, name: &str) -> HostValue {
        handle(self.state.borrow_mut().intern_raw(name))
    }

    /// Seed a well-formed tagged record: interned tag in slot 0, then the
    /// given payload fields
    pub fn seed_record(&self, tag: &str, fields: &[HostValue]) -> HostValue {
        let mut state = self.state.borrow_mut();
        let mut slots = vec![state.intern_raw(tag)];
        for field in fields {
            slots.push(state.index(*field));
        }
        let index = state.alloc(Obj::Record(slots));
        handle(index)
    }

    /// Seed a record with arbitrary slots, including a malformed slot 0
    pub fn seed_record_raw(&self, slots: &[HostValue]) -> HostValue {
        let mut state = self.state.borrow_mut();
        let indices: Vec<usize> = slots.iter().map(|slot| state.index(*slot)).collect();
        let index = state.alloc(Obj::Record(indices));
        handle(index)
    }

    // ----- failure injection -----

    /// Make `intern` of `name` signal instead of resolving
    pub fn poison_intern(&self, name: &str) {
        self.state
            .borrow_mut()
            .poison
            .intern
            .insert(name.to_string());
    }

    /// Make `funcall` of the function named `name` signal
    pub fn poison_funcall(&self, name: &str) {
        self.state
            .borrow_mut()
            .poison
            .funcall
            .insert(name.to_string());
    }

    /// Make `funcall` of the function named `name` throw (non-error exit)
    pub fn throw_on(&self, name: &str) {
        self.state
            .borrow_mut()
            .poison
            .throw_on
            .insert(name.to_string());
    }

    /// Make `make_function` refuse and signal
    pub fn poison_make_function(&self) {
        self.state.borrow_mut().poison.make_function = true;
    }

    /// Make `make_global_ref` refuse and signal
    pub fn poison_global_ref(&self) {
        self.state.borrow_mut().poison.global_ref = true;
    }

    /// Override the size reported by the query phase of the string copy
    pub fn misreport_size_query(&self, size: usize) {
        self.state.borrow_mut().poison.size_query = Some(size);
    }

    /// Override the written size reported by the copy phase
    pub fn misreport_copy_size(&self, size: usize) {
        self.state.borrow_mut().poison.copy_size = Some(size);
    }

    /// Make the copy phase fail with a condition
    pub fn fail_copy(&self) {
        self.state.borrow_mut().poison.copy_fail = true;
    }

    // ----- inspection -----

    /// Host entries made so far, not counting exit-state probes
    pub fn call_count(&self) -> usize {
        self.state.borrow().calls
    }

    /// Name of the pending condition symbol (or throw tag), if any
    pub fn pending_condition(&self) -> Option<String> {
        let state = self.state.borrow();
        state.pending.as_ref().map(|pending| {
            match state.arena[pending.condition] {
                Obj::Symbol(ref name) => name.clone(),
                ref other => format!("{:?}", other),
            }
        })
    }

    /// Decoded payload of the pending exit, if any
    pub fn pending_payload(&self) -> Option<Snapshot> {
        let state = self.state.borrow();
        state
            .pending
            .as_ref()
            .map(|pending| state.snap(pending.payload))
    }

    /// Resolve the pending exit, as the host would after unwinding
    pub fn clear_pending(&self) {
        self.state.borrow_mut().pending = None;
    }

    /// Decoded view of any host value
    pub fn snapshot(&self, value: HostValue) -> Snapshot {
        let state = self.state.borrow();
        let index = state.index(value);
        state.snap(index)
    }

    /// Function spec currently bound under `name`, if any
    pub fn resolve_alias(&self, name: &str) -> Option<FunctionSpec> {
        let state = self.state.borrow();
        let index = *state.aliases.get(name)?;
        match state.arena[index] {
            Obj::Function(spec) => Some(spec),
            _ => None,
        }
    }

    /// Resolve `name` and run its callback, as host code calling the alias
    ///
    /// Returns `None` when nothing callable is bound under `name`. The
    /// arena borrow is released before the callback runs, so the callback
    /// is free to reenter the host.
    pub fn invoke_alias(
        &self,
        env: &Env<'_>,
        name: &str,
        args: &[HostValue],
    ) -> Option<HostValue> {
        let spec = self.resolve_alias(name)?;
        Some((spec.callback)(env, args, spec.data))
    }

    /// Number of names bound through `defalias`
    pub fn alias_count(&self) -> usize {
        self.state.borrow().aliases.len()
    }

    /// Number of handles promoted with `make_global_ref`
    pub fn global_ref_count(&self) -> usize {
        self.state.borrow().globals.len()
    }
}

impl HostRuntime for MockHost {
    fn intern(&self, name: &str) -> HostValue {
        let mut state = self.state.borrow_mut();
        state.enter("intern");
        if state.poison.intern.contains(name) {
            state.signal_raw("mock-intern-poisoned", &[]);
            let nil = state.intern_raw("nil");
            return handle(nil);
        }
        let index = state.intern_raw(name);
        handle(index)
    }

    fn make_integer(&self, value: i64) -> HostValue {
        let mut state = self.state.borrow_mut();
        state.enter("make_integer");
        let index = state.alloc_integer(value);
        handle(index)
    }

    fn extract_integer(&self, value: HostValue) -> i64 {
        let mut state = self.state.borrow_mut();
        state.enter("extract_integer");
        let index = state.index(value);
        match state.arena[index] {
            Obj::Integer(inner) => inner,
            _ => {
                state.signal_raw("wrong-type-argument", &[index]);
                0
            }
        }
    }

    fn make_string(&self, contents: &[u8]) -> HostValue {
        let mut state = self.state.borrow_mut();
        state.enter("make_string");
        let index = state.alloc(Obj::Str(contents.to_vec()));
        handle(index)
    }

    fn copy_string_contents(
        &self,
        source: HostValue,
        dest: Option<&mut [u8]>,
        size: &mut usize,
    ) -> bool {
        let mut state = self.state.borrow_mut();
        state.enter("copy_string_contents");
        let index = state.index(source);
        let bytes = match state.arena[index] {
            Obj::Str(ref bytes) => bytes.clone(),
            _ => {
                state.signal_raw("wrong-type-argument", &[index]);
                return false;
            }
        };
        match dest {
            None => {
                *size = state.poison.size_query.unwrap_or(bytes.len());
                true
            }
            Some(buffer) => {
                if state.poison.copy_fail {
                    state.signal_raw("mock-copy-refused", &[index]);
                    return false;
                }
                let copied = bytes.len().min(buffer.len());
                buffer[..copied].copy_from_slice(&bytes[..copied]);
                *size = state.poison.copy_size.unwrap_or(copied);
                true
            }
        }
    }

    fn funcall(&self, function: HostValue, args: &[HostValue]) -> HostValue {
        let mut state = self.state.borrow_mut();
        state.enter("funcall");
        let callee = state.index(function);
        let name = match state.arena[callee] {
            Obj::Symbol(ref symbol) => symbol.clone(),
            _ => {
                state.signal_raw("invalid-function", &[callee]);
                let nil = state.intern_raw("nil");
                return handle(nil);
            }
        };
        if state.poison.funcall.contains(&name) {
            state.signal_raw("mock-funcall-poisoned", &[callee]);
            let nil = state.intern_raw("nil");
            return handle(nil);
        }
        if state.poison.throw_on.contains(&name) {
            state.throw_raw(&name);
            let nil = state.intern_raw("nil");
            return handle(nil);
        }
        let arg_indices: Vec<usize> = args.iter().map(|value| state.index(*value)).collect();
        let result = state.dispatch(&name, &arg_indices);
        handle(result)
    }

    fn eq(&self, a: HostValue, b: HostValue) -> bool {
        let mut state = self.state.borrow_mut();
        state.enter("eq");
        let left = state.index(a);
        let right = state.index(b);
        if left == right {
            return true;
        }
        // Equal integers compare identical, like host fixnums
        matches!(
            (&state.arena[left], &state.arena[right]),
            (Obj::Integer(x), Obj::Integer(y)) if x == y
        )
    }

    fn make_function(&self, spec: FunctionSpec) -> HostValue {
        let mut state = self.state.borrow_mut();
        state.enter("make_function");
        if state.poison.make_function {
            state.signal_raw("mock-make-function-refused", &[]);
            let nil = state.intern_raw("nil");
            return handle(nil);
        }
        let index = state.alloc(Obj::Function(spec));
        handle(index)
    }

    fn non_local_exit_check(&self) -> ExitStatus {
        self.state
            .borrow()
            .pending
            .as_ref()
            .map_or(ExitStatus::Returned, |pending| pending.status)
    }

    fn non_local_exit_signal(&self, condition: HostValue, payload: HostValue) {
        let mut state = self.state.borrow_mut();
        state.enter("non_local_exit_signal");
        let condition = state.index(condition);
        let payload = state.index(payload);
        state.pending = Some(PendingState {
            status: ExitStatus::Signaled,
            condition,
            payload,
        });
    }

    fn make_global_ref(&self, value: HostValue) -> HostValue {
        let mut state = self.state.borrow_mut();
        state.enter("make_global_ref");
        if state.poison.global_ref {
            state.signal_raw("mock-global-ref-refused", &[]);
            let nil = state.intern_raw("nil");
            return handle(nil);
        }
        let index = state.index(value);
        state.globals.push(index);
        handle(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(env: &Env<'_>, _args: &[HostValue], _data: *mut c_void) -> HostValue {
        env.nil()
    }

    #[test]
    fn test_intern_dedups() {
        let host = MockHost::new();
        let first = host.intern("list");
        let second = host.intern("list");
        assert!(host.eq(first, second));
    }

    #[test]
    fn test_predicate_dispatch() {
        let host = MockHost::new();
        let text = host.seed_string("hello");
        let num = host.seed_integer(3);
        let t = host.seed_symbol("t");
        let nil = host.seed_symbol("nil");

        let stringp = host.intern("stringp");
        assert!(host.eq(host.funcall(stringp, &[text]), t));
        assert!(host.eq(host.funcall(stringp, &[num]), nil));
    }

    #[test]
    fn test_record_and_aref() {
        let host = MockHost::new();
        let payload = host.seed_integer(99);
        let record = host.seed_record("TSTree", &[payload]);

        let aref = host.intern("aref");
        let zero = host.make_integer(0);
        let tag = host.funcall(aref, &[record, zero]);
        assert_eq!(host.snapshot(tag), Snapshot::Symbol("TSTree".to_string()));

        let one = host.make_integer(1);
        let slot = host.funcall(aref, &[record, one]);
        assert_eq!(host.snapshot(slot), Snapshot::Integer(99));
    }

    #[test]
    fn test_aref_out_of_range_signals() {
        let host = MockHost::new();
        let record = host.seed_record("TSNode", &[]);
        let aref = host.intern("aref");
        let five = host.make_integer(5);
        host.funcall(aref, &[record, five]);
        assert_eq!(host.pending_condition().as_deref(), Some("args-out-of-range"));
    }

    #[test]
    fn test_defalias_binds() {
        let host = MockHost::new();
        let spec = FunctionSpec::new(0, "noop", noop);
        let function = host.make_function(spec);
        let name = host.intern("arbor-noop");
        let defalias = host.intern("defalias");
        host.funcall(defalias, &[name, function]);
        assert_eq!(host.alias_count(), 1);
        assert!(host.resolve_alias("arbor-noop").is_some());
    }

    #[test]
    fn test_invoke_alias_runs_bound_callback() {
        let host = MockHost::new();
        let env = Env::init(&host).unwrap();
        assert!(host.invoke_alias(&env, "missing", &[]).is_none());

        assert!(env.register("arbor-nil", FunctionSpec::new(0, "doc", noop)));
        let out = host.invoke_alias(&env, "arbor-nil", &[]).unwrap();
        assert!(host.eq(out, env.nil()));
    }

    #[test]
    fn test_unknown_function_signals() {
        let host = MockHost::new();
        let missing = host.intern("no-such-function");
        host.funcall(missing, &[]);
        assert_eq!(host.pending_condition().as_deref(), Some("void-function"));
    }

    #[test]
    fn test_integer_eq_matches_fixnums() {
        let host = MockHost::new();
        let a = host.seed_integer(42);
        let b = host.seed_integer(42);
        let c = host.seed_integer(43);
        assert!(host.eq(a, b));
        assert!(!host.eq(a, c));
    }

    #[test]
    fn test_seeders_skip_ledger() {
        let host = MockHost::new();
        host.seed_string("abc");
        host.seed_integer(1);
        host.seed_record("TSParser", &[]);
        assert_eq!(host.call_count(), 0);
    }

    #[test]
    fn test_copy_phases() {
        let host = MockHost::new();
        let text = host.seed_string("abcd");
        let mut size = 0usize;
        assert!(host.copy_string_contents(text, None, &mut size));
        assert_eq!(size, 4);

        let mut buffer = vec![0u8; size];
        let mut written = size;
        assert!(host.copy_string_contents(text, Some(&mut buffer[..]), &mut written));
        assert_eq!(written, 4);
        assert_eq!(buffer, b"abcd");
    }

    #[test]
    #[should_panic(expected = "while a non-local exit is pending")]
    fn test_entry_while_pending_panics() {
        let host = MockHost::new();
        let missing = host.intern("no-such-function");
        host.funcall(missing, &[]);
        host.intern("t");
    }

    #[test]
    fn test_exit_check_is_exempt_while_pending() {
        let host = MockHost::new();
        let missing = host.intern("no-such-function");
        host.funcall(missing, &[]);
        assert_eq!(host.non_local_exit_check(), ExitStatus::Signaled);
        host.clear_pending();
        assert_eq!(host.non_local_exit_check(), ExitStatus::Returned);
    }
}
