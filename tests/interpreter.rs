#[cfg(test)]
mod interpreter_tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use mini_cpp as mc;

    use mc::ast::Program;
    use mc::interpreter::{IResult, RuntimeError, World};
    use mc::parser::parse_source;
    use mc::value::Value;

    fn parse(source: &str) -> Program {
        parse_source(source.as_bytes()).expect("should parse")
    }

    /// Parse `source` and run its `main`.
    fn run(source: &str) -> IResult<Value> {
        let program = parse(source);
        let mut world = World::new();
        world.run(&program, "main")
    }

    fn run_number(source: &str) -> f64 {
        match run(source) {
            Ok(value) => value.as_number(),
            Err(e) => panic!("Program failed: {}", e),
        }
    }

    // ── call protocol ──────────────────────────────────────────────────

    #[test]
    fn test_missing_return_yields_zero() {
        assert_eq!(run("int main() { int x = 5; x = x + 1; }"), Ok(Value::Number(0.0)));
        assert_eq!(run("int main() { return; }"), Ok(Value::Number(0.0)));
    }

    #[test]
    fn test_arguments_and_recursion() {
        let source = "
            int fib(int n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            int main() { return fib(10); }
        ";

        assert_eq!(run_number(source), 55.0);
    }

    #[test]
    fn test_call_func_with_host_supplied_arguments() {
        let program = parse("int add(int a, int b) { return a + b; }");
        let mut world = World::new();
        world.collect_functions(&program);

        let result = world.call_func("add", &[Value::Number(2.0), Value::Bool(true)]);

        assert_eq!(result, Ok(Value::Number(3.0)));
    }

    #[test]
    fn test_nested_calls_do_not_disturb_the_caller() {
        let source = "
            int one() { return 1; }
            int main() {
                int total = 0;
                while (true) {
                    total = total + one();
                    if (total >= 3) return total + one() * 10;
                }
            }
        ";

        assert_eq!(run_number(source), 13.0);
    }

    #[test]
    fn test_arity_mismatch() {
        let source = "
            int add(int a, int b) { return a + b; }
            int main() { return add(1); }
        ";

        assert_eq!(
            run(source),
            Err(RuntimeError::ArityMismatch {
                name: "add".to_string(),
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            run("int main() { return nope(); }"),
            Err(RuntimeError::UnknownFunction {
                name: "nope".to_string()
            })
        );
    }

    #[test]
    fn test_missing_entry_function() {
        let program = parse("int helper() { return 1; }");
        let mut world = World::new();

        assert!(matches!(
            world.run(&program, "main"),
            Err(RuntimeError::UnknownFunction { name }) if name == "main"
        ));
    }

    #[test]
    fn test_duplicate_parameter_names() {
        let source = "
            int f(int a, int a) { return a; }
            int main() { return f(1, 2); }
        ";

        assert_eq!(
            run(source),
            Err(RuntimeError::Redeclaration {
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn test_body_may_shadow_parameter() {
        let source = "
            int f(int a) { int a = a * 5; return a; }
            int main() { return f(2); }
        ";

        assert_eq!(run_number(source), 10.0);
    }

    #[test]
    fn test_callee_reads_caller_locals() {
        let source = "
            int peek() { return secret; }
            int main() { int secret = 7; return peek(); }
        ";

        assert_eq!(run_number(source), 7.0);
    }

    #[test]
    fn test_callee_assigns_caller_locals() {
        let source = "
            int bump() { n = n + 1; return 0; }
            int main() { int n = 1; bump(); bump(); return n; }
        ";

        assert_eq!(run_number(source), 3.0);
    }

    #[test]
    fn test_callee_locals_vanish_on_return() {
        let source = "
            int make() { int tmp = 1; return tmp; }
            int main() { make(); return tmp; }
        ";

        assert_eq!(
            run(source),
            Err(RuntimeError::UndeclaredName {
                name: "tmp".to_string()
            })
        );
    }

    #[test]
    fn test_globals_are_shared_between_functions() {
        let source = "
            int counter = 10;
            int bump() { counter = counter + 1; return counter; }
            int main() { bump(); bump(); return counter; }
        ";

        assert_eq!(run_number(source), 12.0);
    }

    #[test]
    fn test_globals_need_init_before_call_func() {
        let program = parse("int g = 5; int get() { return g; }");
        let mut world = World::new();
        world.collect_functions(&program);

        assert_eq!(
            world.call_func("get", &[]),
            Err(RuntimeError::UndeclaredName {
                name: "g".to_string()
            })
        );

        assert_eq!(world.init_globals(&program), Ok(()));
        assert_eq!(world.call_func("get", &[]), Ok(Value::Number(5.0)));
    }

    #[test]
    fn test_loading_twice_is_ignored() {
        let first = parse("int f() { return 1; }");
        let second = parse("int f() { return 2; } int g() { return 3; }");
        let mut world = World::new();

        world.collect_functions(&first);
        world.collect_functions(&second);

        assert_eq!(world.call_func("f", &[]), Ok(Value::Number(1.0)));
        assert_eq!(
            world.call_func("g", &[]),
            Err(RuntimeError::UnknownFunction {
                name: "g".to_string()
            })
        );
    }

    #[test]
    fn test_run_after_manual_load() {
        let program = parse("int g = 4; int main() { g = g + 1; return g; }");
        let mut world = World::new();

        world.collect_functions(&program);
        assert_eq!(world.init_globals(&program), Ok(()));

        assert_eq!(world.run(&program, "main"), Ok(Value::Number(5.0)));
        assert_eq!(world.init_globals(&program), Ok(()));
        assert_eq!(world.env().lookup("g"), Some(Value::Number(5.0)));
    }

    #[test]
    fn test_scope_depth_restored_after_calls() {
        let program = parse(
            "
            int ok() { { int x = 1; { return x; } } }
            int broken() { { int y = 1; { int y = 2; int y = 3; } } return 0; }
            ",
        );
        let mut world = World::new();
        world.collect_functions(&program);

        assert_eq!(world.call_func("ok", &[]), Ok(Value::Number(1.0)));
        assert_eq!(world.env().depth(), 1);

        assert!(world.call_func("broken", &[]).is_err());
        assert_eq!(world.env().depth(), 1);
    }

    // ── host functions ─────────────────────────────────────────────────

    #[test]
    fn test_short_circuit_skips_right_operand() {
        let program = parse(
            "
            int main() {
                bool a = false && tick();
                bool b = true || tick();
                bool c = true && tick();
                bool d = false || tick();
                return !a && b && c && d;
            }
            ",
        );

        let ticks = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&ticks);

        let mut world = World::new();
        world.register_host("tick", 0, move |_| {
            counter.set(counter.get() + 1);
            Value::Number(1.0)
        });

        assert_eq!(world.run(&program, "main"), Ok(Value::Bool(true)));
        assert_eq!(ticks.get(), 2, "right operand evaluated only when needed");
    }

    #[test]
    fn test_return_in_nested_block_stops_everything_after_it() {
        let program = parse(
            "
            int main() {
                mark(1);
                while (true) {
                    mark(2);
                    {
                        mark(3);
                        if (true) { mark(4); return 42; mark(5); }
                        mark(6);
                    }
                    mark(7);
                }
                mark(8);
            }
            ",
        );

        let marks = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&marks);

        let mut world = World::new();
        world.register_host("mark", 1, move |args| {
            sink.borrow_mut().push(args[0].as_number());
            args[0]
        });

        assert_eq!(world.run(&program, "main"), Ok(Value::Number(42.0)));
        assert_eq!(*marks.borrow(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_while_condition_not_rechecked_after_return() {
        let program = parse(
            "
            int main() {
                int i = 0;
                while (check(i)) {
                    i = i + 1;
                    if (i == 3) return i;
                }
                return -1;
            }
            ",
        );

        let checks = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&checks);

        let mut world = World::new();
        world.register_host("check", 1, move |_| {
            counter.set(counter.get() + 1);
            Value::Bool(true)
        });

        assert_eq!(world.run(&program, "main"), Ok(Value::Number(3.0)));
        assert_eq!(checks.get(), 3, "condition evaluated once per iteration only");
    }

    #[test]
    fn test_for_step_skipped_after_return() {
        let program = parse(
            "
            int main() {
                int i;
                for (i = 0; i < 10; i = step(i)) {
                    if (i == 2) return i;
                }
                return -1;
            }
            ",
        );

        let steps = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&steps);

        let mut world = World::new();
        world.register_host("step", 1, move |args| {
            counter.set(counter.get() + 1);
            Value::Number(args[0].as_number() + 1.0)
        });

        assert_eq!(world.run(&program, "main"), Ok(Value::Number(2.0)));
        assert_eq!(steps.get(), 2);
    }

    #[test]
    fn test_host_function_arity_is_checked() {
        let program = parse("int main() { return twice(); }");

        let mut world = World::new();
        world.register_host("twice", 1, |args| Value::Number(args[0].as_number() * 2.0));

        assert_eq!(
            world.run(&program, "main"),
            Err(RuntimeError::ArityMismatch {
                name: "twice".to_string(),
                expected: 1,
                found: 0,
            })
        );
    }

    #[test]
    fn test_user_function_shadows_host() {
        let program = parse(
            "
            int twice(int x) { return x * 3; }
            int main() { return twice(2); }
            ",
        );

        let mut world = World::new();
        world.register_host("twice", 1, |args| Value::Number(args[0].as_number() * 2.0));

        assert_eq!(world.run(&program, "main"), Ok(Value::Number(6.0)));
    }

    // ── scoping ────────────────────────────────────────────────────────

    #[test]
    fn test_redeclaration_in_same_scope() {
        assert_eq!(
            run("int main() { int a = 1; int a = 2; return a; }"),
            Err(RuntimeError::Redeclaration {
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn test_shadowing_restores_outer_binding() {
        let source = "
            int main() {
                int a = 1;
                { int a = 2; a = 3; }
                return a;
            }
        ";

        assert_eq!(run_number(source), 1.0);
    }

    #[test]
    fn test_assignment_reaches_outer_scope() {
        let source = "
            int main() {
                int a = 1;
                { { a = 5; } }
                return a;
            }
        ";

        assert_eq!(run_number(source), 5.0);
    }

    #[test]
    fn test_block_locals_do_not_leak() {
        assert_eq!(
            run("int main() { { int inner = 1; } return inner; }"),
            Err(RuntimeError::UndeclaredName {
                name: "inner".to_string()
            })
        );
    }

    #[test]
    fn test_assignment_to_undeclared() {
        assert_eq!(
            run("int main() { ghost = 1; }"),
            Err(RuntimeError::UndeclaredName {
                name: "ghost".to_string()
            })
        );
    }

    #[test]
    fn test_declaration_defaults_to_zero() {
        assert_eq!(run_number("int main() { int x; return x; }"), 0.0);
    }

    // ── statements ─────────────────────────────────────────────────────

    #[test]
    fn test_for_loop_sum() {
        let source = "
            int main() {
                int s = 0;
                int i;
                for (i = 0; i < 5; i = i + 1) { s = s + i; }
                return s;
            }
        ";

        assert_eq!(run_number(source), 10.0);
    }

    #[test]
    fn test_for_without_condition_runs_until_return() {
        let source = "
            int main() {
                int i = 0;
                for (;;) { i = i + 1; if (i == 3) return i; }
            }
        ";

        assert_eq!(run_number(source), 3.0);
    }

    #[test]
    fn test_while_loop() {
        let source = "
            int main() {
                int n = 10;
                int steps = 0;
                while (n != 1) {
                    if (n % 2 == 0) n = n / 2; else n = 3 * n + 1;
                    steps = steps + 1;
                }
                return steps;
            }
        ";

        assert_eq!(run_number(source), 6.0);
    }

    #[test]
    fn test_if_without_else_and_false_condition() {
        assert_eq!(run_number("int main() { int x = 1; if (0) x = 2; return x; }"), 1.0);
        assert_eq!(
            run_number("int main() { int x = 1; if (0) x = 2; else x = 3; return x; }"),
            3.0
        );
    }

    // ── expressions ────────────────────────────────────────────────────

    #[test]
    fn test_assignment_is_an_expression() {
        let source = "
            int main() {
                int a = 0;
                int b = (a = 5) + 1;
                return a + b;
            }
        ";

        assert_eq!(run_number(source), 11.0);
    }

    #[test]
    fn test_remainder_is_floating_point() {
        assert_eq!(run_number("int main() { return 5 % 2; }"), 1.0);
        assert_eq!(run_number("int main() { return 5.5 % 2; }"), 1.5);
        assert_eq!(run_number("int main() { return -5 % 2; }"), -1.0);
    }

    /// Division by zero is not an error: it follows IEEE-754.
    #[test]
    fn test_division_by_zero_is_not_an_error() {
        assert_eq!(run_number("int main() { return 1 / 0; }"), f64::INFINITY);
        assert_eq!(run_number("int main() { return -1 / 0; }"), f64::NEG_INFINITY);
        assert!(run_number("int main() { return 1 % 0; }").is_nan());
    }

    #[test]
    fn test_logical_results_are_boolean() {
        assert_eq!(run("int main() { return 2 && 3; }"), Ok(Value::Bool(true)));
        assert_eq!(run("int main() { return 0 || 0; }"), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_coercions() {
        assert_eq!(run("int main() { return true + true; }"), Ok(Value::Number(2.0)));
        assert_eq!(run("int main() { return -true; }"), Ok(Value::Number(-1.0)));
        assert_eq!(run("int main() { return !0; }"), Ok(Value::Bool(true)));
        assert_eq!(run("int main() { return !0.5; }"), Ok(Value::Bool(false)));
        assert_eq!(run("int main() { return 1 == true; }"), Ok(Value::Bool(true)));
        assert_eq!(run("int main() { return 3 > false; }"), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::Bool(false).as_number(), 0.0);
        assert!(Value::Number(f64::NAN).as_bool());
        assert!(!Value::Number(-0.0).as_bool());
        assert_eq!(Value::default(), Value::Number(0.0));
    }
}
