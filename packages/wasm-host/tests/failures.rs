use std::sync::Arc;

use wasm_host::diagnostics::AbortDiagnostic;
use wasm_host::runtime::greet_round_trip;
use wasm_host::{GuestInstance, HostConfig, HostError, HostRuntime, MemorySink, RunReport};

const GREETER: &str = include_str!("fixtures/greeter.wat");

fn instantiate(wat: &str, sink: &MemorySink) -> Result<GuestInstance, HostError> {
    let runtime = HostRuntime::new(HostConfig::default()).unwrap();
    let module = runtime.compile(wat.as_bytes()).unwrap();
    runtime.instantiate(&module, Arc::new(sink.clone()))
}

fn greeter(sink: &MemorySink) -> GuestInstance {
    let Ok(guest) = instantiate(GREETER, sink) else {
        panic!("greeter fixture failed to instantiate")
    };
    guest
}

#[test]
fn abort_reaches_the_sink_and_the_call_completes() {
    let sink = MemorySink::new();
    let mut guest = greeter(&sink);

    let results = guest.call_dynamic("fail", &[]).unwrap();
    assert_eq!(results, vec![0]);
    assert_eq!(
        sink.records(),
        vec![AbortDiagnostic {
            message: "oops".into(),
            filename: "test.ts".into(),
            line: 10,
            column: 5,
        }]
    );

    // The instance is still usable afterwards.
    assert_eq!(greet_round_trip(&mut guest, "Jamal").unwrap(), "Hello, Jamal");
}

#[test]
fn trap_is_a_guest_trap_error() {
    let sink = MemorySink::new();
    let mut guest = greeter(&sink);
    let err = guest.call_dynamic("crash", &[]).unwrap_err();
    assert!(
        matches!(err, HostError::GuestTrap { ref export, .. } if export == "crash"),
        "got {err:?}"
    );
    assert!(sink.records().is_empty());
}

#[test]
fn wrong_argument_count_is_rejected_before_the_call() {
    let sink = MemorySink::new();
    let mut guest = greeter(&sink);
    let err = guest.call_dynamic("add", &[1]).unwrap_err();
    assert!(matches!(err, HostError::Call { .. }), "got {err:?}");
}

#[test]
fn wrong_signature_is_a_call_error() {
    let sink = MemorySink::new();
    let mut guest = greeter(&sink);
    let Err(err) = guest.resolve_function::<i32, i32>("add") else {
        panic!("add should not resolve as (i32) -> i32")
    };
    assert!(matches!(err, HostError::Call { .. }), "got {err:?}");
}

#[test]
fn missing_or_mismatched_exports() {
    let sink = MemorySink::new();
    let mut guest = greeter(&sink);

    let Err(err) = guest.resolve_function::<i32, i32>("shout") else {
        panic!("shout is not exported")
    };
    assert!(
        matches!(err, HostError::ExportNotFound { ref name, expected: "function" } if name == "shout"),
        "got {err:?}"
    );

    let err = guest.resolve_memory("add").unwrap_err();
    assert!(
        matches!(err, HostError::ExportNotFound { expected: "memory", .. }),
        "got {err:?}"
    );
    assert!(guest.resolve_memory("memory").is_ok());
}

#[test]
fn guest_without_memory_fails_to_bind() {
    let sink = MemorySink::new();
    let wat = r#"
        (module
          (func (export "allocate") (param i32) (result i32) (local.get 0))
          (func (export "deallocate") (param i32)))
    "#;
    let Err(err) = instantiate(wat, &sink) else {
        panic!("expected instantiation to fail")
    };
    assert!(
        matches!(err, HostError::ExportNotFound { ref name, .. } if name == "memory"),
        "got {err:?}"
    );
}

#[test]
fn guest_without_greet_fails_the_round_trip() {
    let sink = MemorySink::new();
    let wat = r#"
        (module
          (memory (export "memory") 1)
          (func (export "allocate") (param i32) (result i32) (i32.const 64))
          (func (export "deallocate") (param i32)))
    "#;
    let Ok(mut guest) = instantiate(wat, &sink) else {
        panic!("expected instantiation to succeed")
    };
    let err = greet_round_trip(&mut guest, "Jamal").unwrap_err();
    assert!(
        matches!(err, HostError::ExportNotFound { ref name, .. } if name == "greet"),
        "got {err:?}"
    );
}

#[test]
fn negative_allocation_is_an_allocation_error() {
    let sink = MemorySink::new();
    let wat = r#"
        (module
          (memory (export "memory") 1)
          (func (export "allocate") (param i32) (result i32) (i32.const -8))
          (func (export "deallocate") (param i32))
          (func (export "greet") (param i32) (result i32) (local.get 0)))
    "#;
    let Ok(mut guest) = instantiate(wat, &sink) else {
        panic!("expected instantiation to succeed")
    };
    let err = greet_round_trip(&mut guest, "Jamal").unwrap_err();
    assert!(matches!(err, HostError::Allocation { size: 10, .. }), "got {err:?}");
}

#[test]
fn out_of_bounds_allocation_is_an_allocation_error() {
    let sink = MemorySink::new();
    let wat = r#"
        (module
          (memory (export "memory") 1)
          (func (export "allocate") (param i32) (result i32) (i32.const 65534))
          (func (export "deallocate") (param i32)))
    "#;
    let Ok(mut guest) = instantiate(wat, &sink) else {
        panic!("expected instantiation to succeed")
    };
    let err = wasm_host::write_string_to_guest(&mut guest, "Jamal").unwrap_err();
    assert!(matches!(err, HostError::Allocation { .. }), "got {err:?}");
}

#[test]
fn trapping_deallocate_is_a_deallocation_error() {
    let sink = MemorySink::new();
    let wat = r#"
        (module
          (memory (export "memory") 1)
          (func (export "allocate") (param i32) (result i32) (i32.const 64))
          (func (export "deallocate") (param i32) unreachable))
    "#;
    let Ok(mut guest) = instantiate(wat, &sink) else {
        panic!("expected instantiation to succeed")
    };
    let offset = wasm_host::write_string_to_guest(&mut guest, "Jamal").unwrap();
    let err = wasm_host::free_guest(&mut guest, offset).unwrap_err();
    assert!(
        matches!(err, HostError::Deallocation { offset: 64, .. }),
        "got {err:?}"
    );
}

#[test]
fn unresolved_import_is_an_instantiation_error() {
    let sink = MemorySink::new();
    let wat = r#"
        (module
          (import "env" "seed" (func (result i32)))
          (memory (export "memory") 1))
    "#;
    let Err(err) = instantiate(wat, &sink) else {
        panic!("expected instantiation to fail")
    };
    assert!(matches!(err, HostError::Instantiation(_)), "got {err:?}");
}

#[test]
fn abort_before_the_instance_is_bound_fails_instantiation() {
    let sink = MemorySink::new();
    let wat = r#"
        (module
          (import "env" "abort" (func $abort (param i32 i32 i32 i32)))
          (memory (export "memory") 1)
          (func $init
            (call $abort (i32.const 0) (i32.const 0) (i32.const 1) (i32.const 1)))
          (start $init))
    "#;
    let Err(err) = instantiate(wat, &sink) else {
        panic!("expected instantiation to fail")
    };
    assert!(matches!(err, HostError::Instantiation(_)), "got {err:?}");
    assert!(sink.records().is_empty());
}

#[test]
fn invalid_binary_is_a_compile_error() {
    let runtime = HostRuntime::new(HostConfig::default()).unwrap();
    let Err(err) = runtime.compile(b"\0asm\x02\0\0\0garbage") else {
        panic!("garbage should not compile")
    };
    assert!(matches!(err, HostError::Compile(_)), "got {err:?}");
}

#[test]
fn missing_module_file_is_a_load_error() {
    let sink = MemorySink::new();
    let config = HostConfig::default().with_module_path("does/not/exist/release.wasm");
    let runtime = HostRuntime::new(config).unwrap();
    let err = runtime.run(Arc::new(sink.clone())).unwrap_err();
    assert!(matches!(err, HostError::Load { .. }), "got {err:?}");
    assert!(sink.records().is_empty());
}

#[test]
fn full_run_from_a_module_file() {
    let path = std::env::temp_dir().join(format!("wasm-host-greeter-{}.wat", std::process::id()));
    std::fs::write(&path, GREETER).unwrap();

    let sink = MemorySink::new();
    let runtime = HostRuntime::new(HostConfig::default().with_module_path(&path)).unwrap();
    let report = runtime.run(Arc::new(sink.clone()));
    std::fs::remove_file(&path).unwrap();

    assert_eq!(
        report.unwrap(),
        RunReport {
            greeting: "Hello, Jamal".into(),
            sum: 7,
        }
    );
    assert!(sink.records().is_empty());
}
