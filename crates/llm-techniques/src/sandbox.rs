//! Isolated evaluation of model-generated programs.
//!
//! Programs run in an embedded [Rhai](https://rhai.rs) engine on a blocking
//! worker thread. The engine has no file, network or module access; printing
//! is swallowed; operation, recursion and size ceilings apply; and a progress
//! callback terminates the script once its wall-clock budget is spent.
//!
//! JavaScript-flavoured programs are accepted on a best-effort basis:
//! `function name(` declarations, `var` bindings, strict equality operators
//! and `console.*` logging calls are rewritten before compilation.

use crate::error::SandboxError;
use regex::Regex;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{CallFnOptions, Dynamic, Engine, EvalAltResult, Scope};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Name of the zero-argument function a program must define.
pub const ENTRY_POINT: &str = "solution";

/// Wall-clock budget for one program.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Slack given to the worker thread to observe its own deadline before the
/// caller stops waiting.
const JOIN_GRACE: Duration = Duration::from_millis(250);

/// Resource ceilings for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxLimits {
    pub timeout: Duration,
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_operations: 500_000_000,
            max_call_levels: 64,
            max_string_size: 1_000_000,
            max_array_size: 100_000,
            max_map_size: 10_000,
        }
    }
}

impl SandboxLimits {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Runs untrusted programs under [`SandboxLimits`].
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    limits: SandboxLimits,
}

impl Sandbox {
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SandboxLimits {
        &self.limits
    }

    /// Compiles `code`, calls its `solution()` function and returns the
    /// string form of the result.
    ///
    /// Top-level statements are not evaluated, so a trailing `solution();`
    /// does not run the program a second time.
    pub async fn run_solution(&self, code: &str) -> Result<String, SandboxError> {
        let script = to_rhai(code);
        let limit_ms = self.limits.timeout_ms();
        self.execute(move |engine| {
            let ast = engine
                .compile(&script)
                .map_err(|err| SandboxError::Compile(err.to_string()))?;
            let mut scope = Scope::new();
            let options = CallFnOptions::new().eval_ast(false);
            engine
                .call_fn_with_options::<Dynamic>(options, &mut scope, &ast, ENTRY_POINT, ())
                .map(display_value)
                .map_err(|err| map_eval_error(*err, limit_ms))
        })
        .await
    }

    /// Evaluates a pure arithmetic expression with floating-point semantics,
    /// so `7 / 2` yields `3.5` and `6 * 7` yields `42`.
    pub async fn evaluate_arithmetic(&self, expression: &str) -> Result<String, SandboxError> {
        let script = float_literals(expression);
        let limit_ms = self.limits.timeout_ms();
        self.execute(move |engine| {
            let ast = engine
                .compile_expression(&script)
                .map_err(|err| SandboxError::Compile(err.to_string()))?;
            engine
                .eval_ast::<Dynamic>(&ast)
                .map(display_value)
                .map_err(|err| map_eval_error(*err, limit_ms))
        })
        .await
    }

    async fn execute<F>(&self, job: F) -> Result<String, SandboxError>
    where
        F: FnOnce(&Engine) -> Result<String, SandboxError> + Send + 'static,
    {
        let limits = self.limits.clone();
        let wait = limits.timeout + JOIN_GRACE;
        let limit_ms = limits.timeout_ms();
        let started = Instant::now();

        let handle = tokio::task::spawn_blocking(move || {
            let engine = build_engine(&limits);
            job(&engine)
        });

        let outcome = match tokio::time::timeout(wait, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => Err(SandboxError::Join(err.to_string())),
            Err(_) => Err(SandboxError::Timeout { limit_ms }),
        };

        match &outcome {
            Ok(value) => debug!(
                target: "llm_techniques::sandbox",
                elapsed_ms = started.elapsed().as_millis() as u64,
                value = %value,
                "Program evaluated"
            ),
            Err(err) => warn!(
                target: "llm_techniques::sandbox",
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %err,
                "Program evaluation failed"
            ),
        }
        outcome
    }
}

fn build_engine(limits: &SandboxLimits) -> Engine {
    let deadline = Instant::now() + limits.timeout;
    let mut engine = Engine::new();
    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("eval");
    engine.set_max_operations(limits.max_operations);
    engine.set_max_call_levels(limits.max_call_levels);
    engine.set_max_string_size(limits.max_string_size);
    engine.set_max_array_size(limits.max_array_size);
    engine.set_max_map_size(limits.max_map_size);
    engine.on_print(|_| {});
    engine.on_debug(|_, _, _| {});
    engine.on_progress(move |_| (Instant::now() >= deadline).then_some(Dynamic::UNIT));
    engine
}

/// Errors raised inside a function call are reported by their cause.
fn innermost(err: EvalAltResult) -> EvalAltResult {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => innermost(*inner),
        other => other,
    }
}

fn is_entry_point(signature: &str) -> bool {
    signature
        .trim_start()
        .strip_prefix(ENTRY_POINT)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

fn map_eval_error(err: EvalAltResult, limit_ms: u64) -> SandboxError {
    if let EvalAltResult::ErrorFunctionNotFound(signature, _) = &err
        && is_entry_point(signature)
    {
        return SandboxError::MissingEntryPoint;
    }
    match innermost(err) {
        EvalAltResult::ErrorTerminated(..) => SandboxError::Timeout { limit_ms },
        other => SandboxError::Runtime(other.to_string()),
    }
}

/// Whole floats print without a fractional part.
fn display_value(value: Dynamic) -> String {
    if let Ok(number) = value.as_float() {
        if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
            return (number as i64).to_string();
        }
        return number.to_string();
    }
    value.to_string()
}

fn to_rhai(code: &str) -> String {
    let mut script = code.to_string();
    let rewrites = [
        (r"console\.(?:log|info|warn|error|debug)\([^;\n]*\)\s*;?", ""),
        (r"\bfunction\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(", "fn $1("),
        (r"\bvar\s+", "let "),
        (r"===", "=="),
        (r"!==", "!="),
    ];
    for (pattern, replacement) in rewrites {
        if let Ok(re) = Regex::new(pattern) {
            script = re.replace_all(&script, replacement).into_owned();
        }
    }
    script
}

fn float_literals(expression: &str) -> String {
    match Regex::new(r"\d+(?:\.\d+)?") {
        Ok(re) => re
            .replace_all(expression, |caps: &regex::Captures| {
                let literal = &caps[0];
                if literal.contains('.') {
                    literal.to_string()
                } else {
                    format!("{literal}.0")
                }
            })
            .into_owned(),
        Err(_) => expression.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runs_solution() {
        let sandbox = Sandbox::default();
        let value = sandbox
            .run_solution("fn solution() { let a = 7; let b = 6; a * b }")
            .await
            .unwrap();
        assert_eq!(value, "42");
    }

    #[tokio::test]
    async fn test_accepts_javascript_style_program() {
        let code = r#"
function solution() {
    var total = 0;
    console.log("computing", total);
    if (total === 0) { total = 10; }
    return total;
}
"#;
        let value = Sandbox::default().run_solution(code).await.unwrap();
        assert_eq!(value, "10");
    }

    #[tokio::test]
    async fn test_infinite_loop_is_preempted() {
        let sandbox = Sandbox::default();
        let started = Instant::now();
        let err = sandbox
            .run_solution("function solution(){ while(true){} }")
            .await
            .unwrap_err();
        assert_eq!(err, SandboxError::Timeout { limit_ms: 1000 });
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_top_level_statements_are_skipped() {
        let code = "function solution() { return 42; }\nsolution();\nwhile (true) {}";
        let started = Instant::now();
        let value = Sandbox::default().run_solution(code).await.unwrap();
        assert_eq!(value, "42");
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_custom_timeout() {
        let sandbox = Sandbox::new(SandboxLimits::default().with_timeout(Duration::from_millis(100)));
        assert_eq!(sandbox.limits().timeout, Duration::from_millis(100));
        assert_eq!(sandbox.limits().max_call_levels, 64);
        let err = sandbox
            .run_solution("fn solution() { loop { } }")
            .await
            .unwrap_err();
        assert_eq!(err, SandboxError::Timeout { limit_ms: 100 });
    }

    #[tokio::test]
    async fn test_missing_entry_point() {
        let err = Sandbox::default()
            .run_solution("let answer = 42;")
            .await
            .unwrap_err();
        assert_eq!(err, SandboxError::MissingEntryPoint);
        assert_eq!(err.to_string(), "solution is not defined");
    }

    #[tokio::test]
    async fn test_compile_and_runtime_errors() {
        let sandbox = Sandbox::default();
        assert!(matches!(
            sandbox.run_solution("fn solution( {").await,
            Err(SandboxError::Compile(_))
        ));

        match sandbox.run_solution("fn solution() { undefined_value + 1 }").await {
            Err(SandboxError::Runtime(message)) => assert!(message.contains("undefined_value")),
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_string_result() {
        let value = Sandbox::default()
            .run_solution(r#"fn solution() { "forty-two" }"#)
            .await
            .unwrap();
        assert_eq!(value, "forty-two");
    }

    #[tokio::test]
    async fn test_arithmetic_uses_float_division() {
        let sandbox = Sandbox::default();
        assert_eq!(sandbox.evaluate_arithmetic("7 / 2").await.unwrap(), "3.5");
        assert_eq!(sandbox.evaluate_arithmetic("6 * 7").await.unwrap(), "42");
        assert_eq!(sandbox.evaluate_arithmetic("(1.5 + 2.5) * 2").await.unwrap(), "8");
        assert!(sandbox.evaluate_arithmetic("1, 2").await.is_err());
    }

    #[test]
    fn test_rewrites() {
        assert_eq!(to_rhai("function solution() {}"), "fn solution() {}");
        assert_eq!(to_rhai("var x = 1; x === 1"), "let x = 1; x == 1");
        assert_eq!(to_rhai("a !== b"), "a != b");
        assert_eq!(to_rhai("console.log(x);\nlet y = 2;"), "\nlet y = 2;");
        assert_eq!(float_literals("10 / 4 + 0.5"), "10.0 / 4.0 + 0.5");
    }

    #[test]
    fn test_entry_point_signature() {
        assert!(is_entry_point("solution"));
        assert!(is_entry_point("solution ()"));
        assert!(!is_entry_point("solution_helper"));
    }
}
