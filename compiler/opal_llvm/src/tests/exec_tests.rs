//! Execution tests: compile, JIT, and check the exit code.

use super::{compile_ir, jit_exit};

#[test]
fn returns_a_constant() {
    let Some(code) = jit_exit("fn main() -> i32 { return 42; }") else {
        return;
    };
    assert_eq!(code, 42);
}

#[test]
fn for_loop_accumulates() {
    let src = "fn main() -> i32 {\n\
               \x20   let mutable x: i32 = 0;\n\
               \x20   for i := 0; i < 10; ++i { x += i; }\n\
               \x20   return x;\n\
               }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 45);
}

#[test]
fn calls_another_function() {
    let src = "fn add(a: i32, b: i32) -> i32 { return a + b; }\n\
               fn main() -> i32 { return add(2, 3); }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 5);
}

#[test]
fn array_initializer_and_subscript() {
    let src = "fn main() -> i32 { let a: [i32; 3] = {1, 2, 3}; return a[2]; }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 3);
}

#[test]
fn inferred_array_from_initializer_list() {
    let src = "fn main() -> i32 { let a = {7, 8, 9}; return a[1]; }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 8);
}

#[test]
fn while_loop_counts() {
    let src = "fn main() -> i32 {\n\
               \x20   let mutable i: i32 = 0;\n\
               \x20   while i < 5 { ++i; }\n\
               \x20   return i;\n\
               }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 5);
}

#[test]
fn loop_breaks_out() {
    let src = "fn main() -> i32 {\n\
               \x20   let mutable i: i32 = 0;\n\
               \x20   loop { ++i; if i == 4 { break; } }\n\
               \x20   return i;\n\
               }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 4);
}

#[test]
fn break_targets_nearest_loop() {
    // The inner while's break must not leave the outer for.
    let src = "fn main() -> i32 {\n\
               \x20   let mutable n: i32 = 0;\n\
               \x20   for i := 0; i < 3; ++i {\n\
               \x20       while true { break; }\n\
               \x20       n += 1;\n\
               \x20   }\n\
               \x20   return n;\n\
               }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 3);
}

#[test]
fn continue_targets_the_step_block() {
    let src = "fn main() -> i32 {\n\
               \x20   let mutable s: i32 = 0;\n\
               \x20   for i := 0; i < 10; ++i {\n\
               \x20       if i % 2 == 0 { continue; }\n\
               \x20       s += i;\n\
               \x20   }\n\
               \x20   return s;\n\
               }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 25);
}

#[test]
fn if_else_both_arms_return() {
    let src = "fn main() -> i32 { if true { return 1; } else { return 2; } }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 1);
}

#[test]
fn else_if_chain_picks_the_right_arm() {
    let src = "fn main() -> i32 {\n\
               \x20   let x: i32 = 2;\n\
               \x20   if x == 1 { return 10; } else if x == 2 { return 20; } else { return 30; }\n\
               }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 20);
}

#[test]
fn integer_condition_is_compared_to_zero() {
    let src = "fn main() -> i32 { if 3 { return 1; } return 0; }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 1);
}

#[test]
fn recursion_works() {
    let src = "fn fib(n: i32) -> i32 {\n\
               \x20   if n < 2 { return n; }\n\
               \x20   return fib(n - 1) + fib(n - 2);\n\
               }\n\
               fn main() -> i32 { return fib(10); }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 55);
}

#[test]
fn greater_than_is_strict() {
    // 5 > 5 must be false.
    let src = "fn main() -> i32 { if 5 > 5 { return 1; } return 0; }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 0);
}

#[test]
fn unsigned_division_uses_udiv() {
    let src = "fn main() -> i32 {\n\
               \x20   let a: u32 = 10;\n\
               \x20   let b: u32 = 3;\n\
               \x20   return (a / b) as i32;\n\
               }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 3);
}

#[test]
fn int_float_cast_round_trip() {
    let src = "fn main() -> i32 { return ((5 as f64) / (2 as f64)) as i32; }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 2);
}

#[test]
fn truncating_cast_keeps_low_bits() {
    let src = "fn main() -> i32 { return 300 as i8 as i32; }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 44);
}

#[test]
fn sixty_four_bit_literal_narrows_wide() {
    let src = "fn main() -> i32 {\n\
               \x20   let big: i64 = 4294967296;\n\
               \x20   return (big / (2 as i64) > 0 as i64) as i32;\n\
               }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 1);
}

#[test]
fn char_literal_is_a_code_point() {
    let src = "fn main() -> i32 { return 'a' as i32 - 97; }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 0);
}

#[test]
fn string_literal_subscripts_as_code_points() {
    let src = "fn main() -> i32 { let s: *char = \"hi\"; return s[1] as i32 - 105; }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 0);
}

#[test]
fn pointer_indirection_reads_and_writes() {
    let src = "fn set(p: *i32) { *p = 5; }\n\
               fn main() -> i32 {\n\
               \x20   let mutable x: i32 = 0;\n\
               \x20   set(&x);\n\
               \x20   return x;\n\
               }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 5);
}

#[test]
fn references_dereference_implicitly() {
    let src = "fn main() -> i32 {\n\
               \x20   let mutable x: i32 = 1;\n\
               \x20   let mutable r: &i32 = &x;\n\
               \x20   r = 41;\n\
               \x20   return x;\n\
               }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 41);
}

#[test]
fn compound_assignments_cover_all_operators() {
    let src = "fn main() -> i32 {\n\
               \x20   let mutable x: i32 = 7;\n\
               \x20   x += 5;\n\
               \x20   x -= 2;\n\
               \x20   x *= 4;\n\
               \x20   x /= 3;\n\
               \x20   x %= 9;\n\
               \x20   return x;\n\
               }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 4);
}

#[test]
fn unary_operators_evaluate() {
    let src = "fn main() -> i32 { return -(-5) + +3 + (!0) as i32; }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 9);
}

#[test]
fn prototype_resolves_to_later_definition() {
    let src = "fn add(a: i32, b: i32) -> i32;\n\
               fn main() -> i32 { return add(20, 22); }\n\
               fn add(a: i32, b: i32) -> i32 { return a + b; }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 42);
}

#[test]
fn extern_symbol_resolves_in_the_process() {
    let src = "extern fn putchar(c: i32) -> i32;\n\
               fn main() -> i32 { return putchar(10) - 10; }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 0);
}

#[test]
fn mangled_symbols_appear_in_the_ir() {
    let ir = compile_ir(
        "fn add(a: i32, b: i32) -> i32 { return a + b; }\n\
         fn main() -> i32 { return add(1, 2); }",
    );
    assert!(ir.contains("_Z3addiiE"), "ir:\n{ir}");
    assert!(ir.contains("_Z4mainE"), "ir:\n{ir}");
}

#[test]
fn void_functions_lower_and_run() {
    let src = "fn noop() { }\n\
               fn main() -> i32 { noop(); return 0; }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 0);
}

#[test]
fn nested_blocks_shadowing_is_not_allowed_but_siblings_are() {
    // Two sibling blocks may both bind the same name.
    let src = "fn main() -> i32 {\n\
               \x20   { let a: i32 = 1; }\n\
               \x20   { let a: i32 = 2; }\n\
               \x20   return 0;\n\
               }";
    let Some(code) = jit_exit(src) else { return };
    assert_eq!(code, 0);
}
