#[cfg(test)]
mod environment_tests {
    use mini_cpp as mc;

    use mc::environment::Environment;
    use mc::value::Value;

    #[test]
    fn test_declare_rejects_duplicates_in_innermost_scope() {
        let mut env = Environment::new();

        assert!(env.declare("x", Value::Number(1.0)));
        assert!(!env.declare("x", Value::Number(2.0)));
        assert_eq!(env.lookup("x"), Some(Value::Number(1.0)), "first binding kept");
    }

    #[test]
    fn test_shadowing_and_pop() {
        let mut env = Environment::new();
        env.declare("x", Value::Number(1.0));

        env.push();
        assert!(env.declare("x", Value::Bool(true)));
        assert_eq!(env.lookup("x"), Some(Value::Bool(true)));

        env.pop();
        assert_eq!(env.lookup("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_assign_updates_nearest_binding() {
        let mut env = Environment::new();
        env.declare("x", Value::Number(1.0));
        env.push();
        env.push();

        assert!(env.assign("x", Value::Number(9.0)));
        assert!(!env.assign("missing", Value::Number(0.0)));

        env.pop();
        env.pop();
        assert_eq!(env.lookup("x"), Some(Value::Number(9.0)));
    }

    #[test]
    fn test_global_scope_is_never_popped() {
        let mut env = Environment::new();
        env.declare("g", Value::Number(3.0));

        env.pop();
        env.pop();

        assert_eq!(env.depth(), 1);
        assert_eq!(env.lookup("g"), Some(Value::Number(3.0)));
    }

    #[test]
    fn test_inner_scopes_see_every_outer_scope() {
        let mut env = Environment::new();
        env.declare("g", Value::Number(1.0));

        // caller activation
        env.push();
        env.declare("local", Value::Number(2.0));

        // callee activation, stacked on the caller's
        env.push();

        assert_eq!(env.lookup("local"), Some(Value::Number(2.0)));
        assert!(env.assign("local", Value::Number(5.0)));
        assert!(env.assign("g", Value::Number(4.0)));

        env.pop();

        assert_eq!(env.lookup("local"), Some(Value::Number(5.0)));
        assert_eq!(env.lookup("g"), Some(Value::Number(4.0)));

        env.pop();
        assert_eq!(env.lookup("local"), None);
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn test_inner_binding_shadows_global() {
        let mut env = Environment::new();
        env.declare("x", Value::Number(1.0));

        env.push();
        env.declare("x", Value::Number(2.0));
        assert!(env.assign("x", Value::Number(3.0)));
        assert_eq!(env.lookup("x"), Some(Value::Number(3.0)));
        env.pop();

        assert_eq!(env.lookup("x"), Some(Value::Number(1.0)));
    }
}
