//! End-to-end builds: descriptors in, artifact on disk, loaded and run

use fluentgen_artifact::{flags, verify_artifact, Artifact, Value, Vm};
use fluentgen_engine::{
    BuildPlan, BuildRequest, Engine, EngineOptions, Literal, MemberDescriptor, Origin, PrimitiveType,
    Session, SourceCatalog, SynthKind, SynthesisError, Synthesizer, TypeDescriptor, TypeRef,
};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

// ===== Fixtures =====

fn point() -> TypeDescriptor {
    TypeDescriptor::class("Acme.Point")
        .with_member(MemberDescriptor::new("X", PrimitiveType::I32))
        .with_member(MemberDescriptor::new("Y", PrimitiveType::I32))
}

fn color() -> TypeDescriptor {
    TypeDescriptor::enumeration(
        "Acme.Color",
        PrimitiveType::I32,
        vec![Literal::new("Red", 1), Literal::new("Green", 2)],
    )
}

fn person_and_address() -> Vec<TypeDescriptor> {
    vec![
        TypeDescriptor::class("Acme.Person")
            .with_member(MemberDescriptor::new("Name", TypeRef::String))
            .with_member(MemberDescriptor::new("Home", TypeRef::named("Acme.Address"))),
        TypeDescriptor::class("Acme.Address")
            .with_member(MemberDescriptor::new("Street", TypeRef::String))
            .with_member(MemberDescriptor::new("Owner", TypeRef::named("Acme.Person"))),
    ]
}

fn options_in(dir: &Path) -> EngineOptions {
    EngineOptions::new().with_output_dir(dir)
}

fn load(path: &Path) -> Vm {
    Vm::from_bytes(&fs::read(path).unwrap()).unwrap()
}

// ===== Builds =====

#[test]
fn test_point_builds_and_chains() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(options_in(dir.path())).unwrap();
    let catalog = SourceCatalog::from_types(vec![point()]).unwrap();

    let result = engine.build(BuildRequest::all(catalog));
    assert!(result.succeeded, "{}", result.message());
    assert_eq!(result.types_requested, 1);
    assert_eq!(result.types_produced, 1);
    assert_eq!(
        result.synthesized,
        vec!["Acme.IPoint", "Acme.PointProxy", "Acme.FluentPoint"]
    );

    let path = result.path.unwrap();
    let hash = crc32fast::hash(b"Acme.Fluent");
    assert_eq!(path, dir.path().join(format!("Acme.Fluent.{:x}.fga", hash)));

    let vm = load(&path);
    assert_eq!(vm.artifact().flags, flags::STANDALONE);
    assert_eq!(vm.artifact().metadata.name, "Acme.Fluent");
    assert!(vm.artifact().metadata.guid.is_some());

    let fluent = vm.new_object("Acme.FluentPoint", &[]).unwrap();
    let chained = vm.invoke(&fluent, "X", &[Value::Int(3)]).unwrap();
    let chained = vm.invoke(&chained, "Y", &[Value::Int(4)]).unwrap();
    assert_eq!(chained, fluent);

    let object = vm.get_property(&fluent, "Object").unwrap();
    assert_eq!(vm.get_property(&object, "X").unwrap(), Value::Int(3));
    assert_eq!(vm.get_property(&object, "Y").unwrap(), Value::Int(4));
}

#[test]
fn test_wrapping_existing_object() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(options_in(dir.path())).unwrap();
    let result = engine.build(BuildRequest::all(SourceCatalog::from_types(vec![point()]).unwrap()));
    let vm = load(&result.path.unwrap());

    let proxy = vm.new_object("Acme.PointProxy", &[]).unwrap();
    vm.set_property(&proxy, "X", Value::Int(7)).unwrap();
    let fluent = vm.new_object("Acme.FluentPoint", &[proxy.clone()]).unwrap();
    assert_eq!(vm.get_property(&fluent, "Object").unwrap(), proxy);
    assert_eq!(vm.invoke(&fluent, "X", &[]).unwrap(), Value::Int(7));
}

#[test]
fn test_explicit_path_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("points.fga");
    let engine = Engine::new(EngineOptions::default()).unwrap();

    let mut metadata = fluentgen_engine::ArtifactMetadata::named("Points");
    metadata.version = Some("2.1.0".to_string());
    metadata.guid = Some("fixed".to_string());
    let request = BuildRequest::new(SourceCatalog::from_types(vec![point()]).unwrap())
        .with_type("Acme.Point")
        .with_path(&path)
        .with_metadata(metadata);

    let result = engine.build(request);
    assert_eq!(result.path.as_deref(), Some(path.as_path()));

    let artifact = Artifact::decode(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(artifact.metadata.name, "Points");
    assert_eq!(artifact.metadata.version.as_deref(), Some("2.1.0"));
    assert_eq!(artifact.metadata.guid.as_deref(), Some("fixed"));
}

#[test]
fn test_zero_member_type_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(options_in(dir.path())).unwrap();
    let catalog = SourceCatalog::from_types(vec![TypeDescriptor::class("Acme.Marker")]).unwrap();

    let result = engine.build(BuildRequest::all(catalog));
    assert!(!result.succeeded);
    assert!(result.path.is_none());
    assert!(matches!(result.error, Some(SynthesisError::EmptyResult { requested: 1 })));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_enum_cloned_once_across_types() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(options_in(dir.path())).unwrap();
    let catalog = SourceCatalog::from_types(vec![
        color(),
        TypeDescriptor::class("Acme.Pen").with_member(MemberDescriptor::new("Ink", TypeRef::named("Acme.Color"))),
        TypeDescriptor::class("Acme.Brush").with_member(MemberDescriptor::new("Fill", TypeRef::named("Acme.Color"))),
    ])
    .unwrap();

    let result = engine.build(BuildRequest::all(catalog));
    assert!(result.succeeded, "{}", result.message());
    assert_eq!(result.types_produced, 2);
    assert_eq!(result.synthesized.iter().filter(|n| *n == "Acme.Color").count(), 1);

    let session = engine.session().unwrap();
    let clones = session.types().iter().filter(|t| t.kind == SynthKind::EnumClone).count();
    assert_eq!(clones, 1);

    let vm = load(&result.path.unwrap());
    assert_eq!(vm.enum_value("Acme.Color", "Green").unwrap(), Value::Int(2));
    let pen = vm.new_object("Acme.FluentPen", &[]).unwrap();
    vm.invoke(&pen, "Ink", &[Value::Int(1)]).unwrap();
    assert_eq!(vm.invoke(&pen, "Ink", &[]).unwrap(), Value::Int(1));
}

#[test]
fn test_cyclic_types() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(options_in(dir.path())).unwrap();
    let catalog = SourceCatalog::from_types(person_and_address()).unwrap();

    let result = engine.build(BuildRequest::all(catalog));
    assert!(result.succeeded, "{}", result.message());
    assert_eq!(result.types_produced, 2);
    assert_eq!(result.synthesized.len(), 6);

    let vm = load(&result.path.unwrap());
    assert_eq!(vm.artifact().flags, flags::STANDALONE);

    let person = vm.new_object("Acme.FluentPerson", &[]).unwrap();
    let address = vm.new_object("Acme.FluentAddress", &[]).unwrap();
    let home = vm.get_property(&address, "Object").unwrap();
    vm.invoke(&address, "Street", &[Value::from("Main St")]).unwrap();
    vm.invoke(&person, "Home", &[home.clone()]).unwrap();

    let owner = vm.get_property(&person, "Object").unwrap();
    vm.set_property(&home, "Owner", owner.clone()).unwrap();

    assert_eq!(vm.invoke(&person, "Home", &[]).unwrap(), home);
    assert_eq!(vm.get_property(&home, "Owner").unwrap(), owner);
}

#[test]
fn test_runtime_member_types_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(options_in(dir.path())).unwrap();
    let catalog = SourceCatalog::from_types(vec![
        TypeDescriptor::class("System.Uri").with_origin(Origin::Runtime),
        TypeDescriptor::class("Acme.Link").with_member(MemberDescriptor::new("Target", TypeRef::named("System.Uri"))),
    ])
    .unwrap();

    let result = engine.build(BuildRequest::all(catalog));
    assert_eq!(result.types_requested, 1);
    assert!(result.succeeded, "{}", result.message());
    let artifact = Artifact::decode(&fs::read(result.path.unwrap()).unwrap()).unwrap();
    assert_eq!(artifact.flags, flags::STANDALONE);
    assert!(artifact.find_type("System.Uri").is_none());
}

#[test]
fn test_every_primitive_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(options_in(dir.path())).unwrap();
    let sample = PrimitiveType::ALL
        .iter()
        .fold(TypeDescriptor::class("Acme.Sample"), |ty, p| {
            ty.with_member(MemberDescriptor::new(format!("{:?}", p), *p))
        });
    let catalog = SourceCatalog::from_types(vec![sample]).unwrap();

    let result = engine.build(BuildRequest::all(catalog));
    assert!(result.succeeded, "{}", result.message());
    let vm = load(&result.path.unwrap());
    let fluent = vm.new_object("Acme.FluentSample", &[]).unwrap();

    let values: Vec<(String, Value)> = PrimitiveType::ALL
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let value = match p {
                PrimitiveType::Bool => Value::Bool(true),
                p if p.is_float() => Value::Float(i as f64 + 0.5),
                _ => Value::Int(i as i64 + 1),
            };
            (format!("{:?}", p), value)
        })
        .collect();

    let mut chained = fluent.clone();
    for (member, value) in &values {
        chained = vm.invoke(&chained, member, &[value.clone()]).unwrap();
        assert_eq!(chained, fluent, "setter for {} must return the wrapper", member);
    }

    let object = vm.get_property(&fluent, "Object").unwrap();
    for (member, value) in &values {
        assert_eq!(&vm.invoke(&fluent, member, &[]).unwrap(), value, "getter for {}", member);
        assert_eq!(&vm.get_property(&object, member).unwrap(), value, "property {}", member);
    }
}

#[test]
fn test_default_metadata_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(options_in(dir.path())).unwrap();
    let catalog = SourceCatalog::from_types(vec![point()]).unwrap();

    let result = engine.build(BuildRequest::all(catalog));
    assert!(result.succeeded, "{}", result.message());
    let metadata = result.metadata.clone().unwrap();
    assert_eq!(metadata.name, "Acme.Fluent");
    assert!(metadata.guid.is_some());
    assert_eq!(load(&result.path.unwrap()).artifact().metadata, metadata);
}

// ===== Dereference modes =====

fn with_missing_member() -> SourceCatalog {
    SourceCatalog::from_types(vec![TypeDescriptor::class("Acme.Order")
        .with_member(MemberDescriptor::new("Id", PrimitiveType::I64))
        .with_member(MemberDescriptor::new("Vendor", TypeRef::named("Other.Vendor")))])
    .unwrap()
}

#[test]
fn test_fail_fast_names_member() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(options_in(dir.path()).with_fail_fast(true)).unwrap();

    let result = engine.build(BuildRequest::all(with_missing_member()));
    match result.error {
        Some(SynthesisError::Dereference { owner, member, ty, .. }) => {
            assert_eq!(owner, "Acme.Order");
            assert_eq!(member, "Vendor");
            assert_eq!(ty, "Other.Vendor");
        }
        other => panic!("expected dereference error, got {:?}", other),
    }
    assert!(result.path.is_none());
}

#[test]
fn test_lenient_keeps_foreign_type() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(options_in(dir.path()).with_fail_fast(false)).unwrap();

    let result = engine.build(BuildRequest::all(with_missing_member()));
    assert!(result.succeeded, "{}", result.message());
    let artifact = Artifact::decode(&fs::read(result.path.unwrap()).unwrap()).unwrap();
    assert_eq!(artifact.flags, flags::LENIENT);
}

#[test]
fn test_dereference_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(options_in(dir.path()).with_dereference(false)).unwrap();
    let catalog = SourceCatalog::from_types(person_and_address()).unwrap();

    let result = engine.build(BuildRequest::new(catalog).with_type("Acme.Person"));
    assert!(result.succeeded, "{}", result.message());
    // Address is not pulled in
    assert_eq!(result.synthesized.len(), 3);
}

// ===== Overwrite policy =====

#[test]
fn test_existing_file_without_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.fga");
    fs::write(&path, b"keep").unwrap();

    let engine = Engine::new(EngineOptions::new().with_overwrite(false)).unwrap();
    let result = engine.build(BuildRequest::all(SourceCatalog::from_types(vec![point()]).unwrap()).with_path(&path));
    assert!(matches!(result.error, Some(SynthesisError::ArtifactExists(_))));
    assert_eq!(fs::read(&path).unwrap(), b"keep");
}

#[test]
fn test_existing_file_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.fga");
    fs::write(&path, b"stale").unwrap();

    let engine = Engine::new(EngineOptions::new().with_overwrite(true)).unwrap();
    let result = engine.build(BuildRequest::all(SourceCatalog::from_types(vec![point()]).unwrap()).with_path(&path));
    assert!(result.succeeded, "{}", result.message());
    assert!(Artifact::decode(&fs::read(&path).unwrap()).is_ok());
}

#[test]
fn test_delete_conflict_event() {
    let dir = tempfile::tempdir().unwrap();
    // A directory cannot be removed as a file
    let path = dir.path().join("occupied.fga");
    fs::create_dir(&path).unwrap();

    let engine = Engine::new(EngineOptions::new().with_overwrite(true)).unwrap();
    let conflicts = Arc::new(Mutex::new(Vec::new()));
    let critical = Arc::new(AtomicUsize::new(0));
    {
        let conflicts = conflicts.clone();
        engine.subscribe_delete_conflict(move |c| conflicts.lock().push(c.path.clone()));
        let critical = critical.clone();
        engine.subscribe_critical_error(move |_| {
            critical.fetch_add(1, Ordering::SeqCst);
        });
    }

    let result = engine.build(BuildRequest::all(SourceCatalog::from_types(vec![point()]).unwrap()).with_path(&path));
    assert!(matches!(result.error, Some(SynthesisError::ArtifactWrite { .. })));
    assert_eq!(conflicts.lock().as_slice(), [path.clone()]);
    assert_eq!(critical.load(Ordering::SeqCst), 1);
    assert!(path.is_dir());
}

// ===== Sessions and concurrency =====

#[test]
fn test_build_in_existing_session() {
    let dir = tempfile::tempdir().unwrap();
    let options = options_in(dir.path());
    let catalog = SourceCatalog::from_types(vec![point()]).unwrap();
    let session = Arc::new(Session::new(Duration::from_secs(5)));

    let first = Synthesizer::new(&catalog, &options, &session)
        .synthesize(&point())
        .unwrap()
        .unwrap();

    let engine = Engine::new(options.clone()).unwrap();
    let result = engine.build_in_session(BuildRequest::all(catalog), session.clone());
    assert!(result.succeeded, "{}", result.message());
    assert_eq!(result.synthesized.len(), 3);

    let cached = session.types();
    assert!(cached.iter().any(|t| Arc::ptr_eq(t, &first.fluent)));
    assert_eq!(engine.session().unwrap().id(), session.id());
}

#[test]
fn test_failed_build_leaves_no_orphans_in_later_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let options = options_in(dir.path());
    let mut types = person_and_address();
    types[0] = types[0]
        .clone()
        .with_member(MemberDescriptor::new("Bad", TypeRef::named("Other.Missing")));
    types.push(point());
    let catalog = SourceCatalog::from_types(types).unwrap();
    let session = Arc::new(Session::new(Duration::from_secs(5)));
    let engine = Engine::new(options).unwrap();

    let failed = engine.build_in_session(BuildRequest::new(catalog.clone()).with_type("Acme.Person"), session.clone());
    assert!(!failed.succeeded);
    assert!(failed.error.is_some());

    let result = engine.build_in_session(BuildRequest::new(catalog).with_type("Acme.Point"), session.clone());
    assert!(result.succeeded, "{}", result.message());
    assert_eq!(
        result.synthesized,
        vec!["Acme.IPoint", "Acme.PointProxy", "Acme.FluentPoint"]
    );

    let artifact = Artifact::decode(&fs::read(result.path.unwrap()).unwrap()).unwrap();
    verify_artifact(&artifact).unwrap();
    assert_eq!(artifact.flags, flags::STANDALONE);
    for ty in &artifact.types {
        for iface in &ty.interfaces {
            assert!(artifact.find_type(iface).is_some(), "{} implements missing {}", ty.name, iface);
        }
    }
}

#[test]
fn test_second_build_rejected_while_busy() {
    let dir = tempfile::tempdir().unwrap();
    let options = options_in(dir.path());
    let engine = Arc::new(Engine::new(options.clone()).unwrap());
    let catalog = SourceCatalog::from_types(vec![point()]).unwrap();

    // A finished interface from a scratch session stands in for slow work
    let scratch = Session::new(Duration::from_secs(5));
    let interface = Synthesizer::new(&catalog, &options, &scratch)
        .synthesize(&point())
        .unwrap()
        .unwrap()
        .interface;

    let session = Arc::new(Session::new(Duration::from_secs(10)));
    let key = fluentgen_engine::CacheKey::new(SynthKind::Interface, "Acme.IPoint");
    let (claimed_tx, claimed_rx) = std::sync::mpsc::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

    let holder = {
        let session = session.clone();
        thread::spawn(move || {
            session
                .cache()
                .get_or_create(&key, || {
                    claimed_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(Some((*interface).clone()))
                })
                .unwrap();
        })
    };
    claimed_rx.recv().unwrap();

    let first = {
        let engine = engine.clone();
        let session = session.clone();
        let catalog = catalog.clone();
        thread::spawn(move || engine.build_in_session(BuildRequest::all(catalog), session))
    };
    while !engine.is_busy() {
        thread::yield_now();
    }

    let second = engine.build(BuildRequest::all(catalog));
    assert!(matches!(second.error, Some(SynthesisError::ConcurrentBuild)));
    assert!(matches!(engine.reset(), Err(SynthesisError::ConcurrentBuild)));
    assert_eq!(engine.session().unwrap().id(), session.id());

    release_tx.send(()).unwrap();
    holder.join().unwrap();
    let first = first.join().unwrap();
    assert!(first.succeeded, "{}", first.message());
    assert!(!engine.is_busy());
}

#[test]
fn test_concurrent_synthesis_shares_types() {
    let options = EngineOptions::default();
    let catalog = SourceCatalog::from_types(vec![
        color(),
        TypeDescriptor::class("Acme.Pen").with_member(MemberDescriptor::new("Ink", TypeRef::named("Acme.Color"))),
        TypeDescriptor::class("Acme.Brush").with_member(MemberDescriptor::new("Fill", TypeRef::named("Acme.Color"))),
    ])
    .unwrap();
    let session = Session::new(Duration::from_secs(10));
    let sources: Vec<TypeDescriptor> = catalog.iter().filter(|t| t.name.name != "Color").cloned().collect();

    let barrier = Barrier::new(8);
    let produced: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let source = &sources[i % sources.len()];
                let (catalog, options, session, barrier) = (&catalog, &options, &session, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    Synthesizer::new(catalog, options, session).synthesize(source)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut pen_fluents = Vec::new();
    for result in produced {
        let types = result.unwrap().unwrap();
        if types.fluent.name.name == "FluentPen" {
            pen_fluents.push(types.fluent);
        }
    }
    assert_eq!(pen_fluents.len(), 4);
    assert!(pen_fluents.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));

    let types = session.types();
    assert_eq!(types.len(), 7);
    assert_eq!(types.iter().filter(|t| t.kind == SynthKind::EnumClone).count(), 1);
}

#[test]
fn test_cancelled_session_fails_build() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(options_in(dir.path())).unwrap();
    let session = Arc::new(Session::new(Duration::from_secs(5)));
    session.cancel();

    let result = engine.build_in_session(
        BuildRequest::all(SourceCatalog::from_types(vec![point()]).unwrap()),
        session,
    );
    assert!(matches!(result.error, Some(SynthesisError::Cancelled)));
}

// ===== Plan facade =====

#[test]
fn test_plan_builds() {
    let dir = tempfile::tempdir().unwrap();
    let mut plan = BuildPlan::new(options_in(dir.path()))
        .unwrap()
        .scan(vec![point(), color()])
        .unwrap()
        .with_path(dir.path().join("plan.fga"));

    let result = plan.execute().unwrap();
    assert!(result.succeeded, "{}", result.message());
    assert_eq!(result.types_requested, 1);
    assert!(dir.path().join("plan.fga").is_file());
    assert!(plan.result().unwrap().succeeded);
}
