use berth_core::reference::ObjectReference;
use berth_core::registry::{FileRegistry, OfferRegistry, RegistryError};
use tempfile::TempDir;

fn reference(s: &str) -> ObjectReference {
    s.parse().unwrap()
}

#[test]
fn missing_file_lists_nothing() {
    let temp = TempDir::new().unwrap();
    let registry = FileRegistry::new(temp.path().join("offers.json"));

    assert!(registry.list().unwrap().is_empty());
    assert!(!registry.path().exists());
}

#[test]
fn add_persists_entries() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state").join("offers.json");
    let registry = FileRegistry::new(&path);

    registry
        .add("Greeter", &reference("greeter:tcp -h localhost -p 10000"))
        .unwrap();
    registry.add("Greeter", &reference("greeter:tcp -p 10001")).unwrap();
    registry.add("Audit", &reference("audit")).unwrap();

    // A fresh handle sees the same state.
    let offers = FileRegistry::new(&path).list().unwrap();
    assert_eq!(offers.len(), 2);
    let greeter: Vec<&str> = offers["Greeter"]
        .iter()
        .map(|e| e.reference.as_str())
        .collect();
    assert_eq!(
        greeter,
        vec!["greeter:tcp -h localhost -p 10000", "greeter:tcp -p 10001"]
    );
    assert_eq!(offers["Audit"][0].reference, "audit");
}

#[test]
fn duplicate_registration_is_rejected() {
    let temp = TempDir::new().unwrap();
    let registry = FileRegistry::new(temp.path().join("offers.json"));
    let greeter = reference("greeter:tcp -p 10000");

    registry.add("Greeter", &greeter).unwrap();
    let err = registry.add("Greeter", &greeter).unwrap_err();

    assert!(matches!(err, RegistryError::AlreadyRegistered { .. }));
    assert_eq!(registry.list().unwrap()["Greeter"].len(), 1);
}

#[test]
fn remove_drops_emptied_offers() {
    let temp = TempDir::new().unwrap();
    let registry = FileRegistry::new(temp.path().join("offers.json"));
    let first = reference("greeter:tcp -p 10000");
    let second = reference("greeter:tcp -p 10001");

    registry.add("Greeter", &first).unwrap();
    registry.add("Greeter", &second).unwrap();

    registry.remove("Greeter", &first).unwrap();
    assert_eq!(registry.list().unwrap()["Greeter"].len(), 1);

    registry.remove("Greeter", &second).unwrap();
    assert!(!registry.list().unwrap().contains_key("Greeter"));
}

#[test]
fn removing_unknown_offer_is_not_found() {
    let temp = TempDir::new().unwrap();
    let registry = FileRegistry::new(temp.path().join("offers.json"));

    let err = registry.remove("Greeter", &reference("greeter")).unwrap_err();
    assert!(err.is_not_found());

    registry.add("Greeter", &reference("greeter")).unwrap();
    let err = registry
        .remove("Greeter", &reference("other:tcp -p 1"))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn corrupt_document_is_a_format_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("offers.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = FileRegistry::new(&path).list().unwrap_err();
    assert!(matches!(err, RegistryError::Format(_)));
}

#[test]
fn no_temporary_files_are_left_behind() {
    let temp = TempDir::new().unwrap();
    let registry = FileRegistry::new(temp.path().join("offers.json"));
    registry.add("Greeter", &reference("greeter")).unwrap();

    let names: Vec<String> = std::fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["offers.json".to_string()]);
}
