use ormtour_core::{Address, Mapped, User};

#[test]
fn user_new_is_transient() {
    let user = User::new("spongebob", "Spongebob Squarepants");

    assert_eq!(user.id, None);
    assert_eq!(user.name.as_deref(), Some("spongebob"));
    assert_eq!(user.fullname.as_deref(), Some("Spongebob Squarepants"));
    assert!(user.addresses.is_empty());
    assert!(!user.is_persisted());
}

#[test]
fn address_constructors_set_back_reference_only_when_asked() {
    assert_eq!(Address::new("a@example.com").user_id, None);
    assert_eq!(Address::for_user("a@example.com", 3).user_id, Some(3));
}

#[test]
fn display_matches_repr_style() {
    let mut user = User::new("spongebob", "Spongebob Squarepants");
    assert_eq!(
        user.to_string(),
        "User(id=None, name='spongebob', fullname='Spongebob Squarepants')"
    );

    user.id = Some(1);
    user.fullname = None;
    assert_eq!(user.to_string(), "User(id=1, name='spongebob', fullname=None)");

    user.name = None;
    assert_eq!(user.to_string(), "User(id=1, name=None, fullname=None)");

    let mut address = Address::new("spongebob@sqlalchemy.org");
    address.id = Some(7);
    assert_eq!(
        address.to_string(),
        "Address(id=7, email_address='spongebob@sqlalchemy.org')"
    );
}

#[test]
fn user_serialization_uses_expected_wire_fields() {
    let mut user = User::new("sandy", "Sandy Cheeks");
    user.id = Some(2);
    user.addresses.push(Address {
        id: Some(5),
        email_address: "sandy@sqlalchemy.org".to_string(),
        user_id: Some(2),
    });

    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["id"], 2);
    assert_eq!(json["name"], "sandy");
    assert_eq!(json["fullname"], "Sandy Cheeks");
    assert_eq!(json["addresses"][0]["email_address"], "sandy@sqlalchemy.org");
    assert_eq!(json["addresses"][0]["user_id"], 2);

    let decoded: User = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, user);
}

#[test]
fn missing_addresses_field_decodes_as_empty() {
    let decoded: User =
        serde_json::from_str(r#"{"id":null,"name":"patrick","fullname":null}"#).unwrap();
    assert!(decoded.addresses.is_empty());
    assert_eq!(decoded.fullname, None);
}

#[test]
fn mapped_tables_match_entity_layout() {
    assert_eq!(User::table().name(), "user_account");
    assert_eq!(User::table().keys(), vec!["id", "name", "fullname"]);
    assert_eq!(Address::table().name(), "address");
    assert_eq!(
        Address::table().keys(),
        vec!["id", "email_address", "user_id"]
    );
    assert_eq!(User::PRIMARY_KEY, "id");
}
