//! Integration tests for the data mapper
//!
//! These tests run the ticketing domain against an in-memory SQLite database:
//! - Aggregate reads rebuilt from the join view
//! - Aggregate writes inside one transaction
//! - Fail-soft collection reads
//! - Authentication
//! - Concurrent access

use rust_data_mapper::prelude::*;
use rust_data_mapper::ticketing::{
    EmailAddress, Ticket, TicketMapper, TicketRelations, User, UserMapper, Workshop,
    WorkshopMapper,
};
use std::sync::Arc;

const SCHEMA: &str = include_str!("fixtures/schema.sql");
const SEED: &str = include_str!("fixtures/seed.sql");

fn seeded() -> Arc<SqliteDatabase> {
    let db = SqliteDatabase::open_in_memory().expect("Failed to open database");
    db.execute_script(SCHEMA).expect("Failed to create schema");
    db.execute_script(SEED).expect("Failed to seed");
    Arc::new(db)
}

fn count(db: &SqliteDatabase, table: &str, conditions: FieldMap) -> usize {
    db.select(table, &conditions, &[], &SelectOptions::new())
        .expect("Count query failed")
        .len()
}

fn email(raw: &str) -> EmailAddress {
    raw.parse().expect("valid email")
}

fn new_user(address: &str, name: &str) -> User {
    let mut user = User::create(
        Record::new()
            .with("email", address)
            .with("full_name", name)
            .with("phone", "+1 555 0100 200"),
    )
    .expect("valid user");
    user.set_password_with_cost("hunter22", 4)
        .expect("Failed to hash password");
    user
}

fn titles(ticket: &Ticket) -> Vec<&str> {
    ticket.workshops().iter().map(Workshop::title).collect()
}

mod ticket_tests {
    use super::*;

    #[test]
    fn test_find_rebuilds_aggregate() {
        let db = seeded();
        let tickets = TicketMapper::new(Arc::clone(&db));

        let ticket = tickets.find(1, None).unwrap().expect("ticket 1");
        assert_eq!(ticket.ip_address().to_string(), "192.168.1.20");
        assert_eq!(ticket.code(), "TKT-ADA-0001");
        assert_eq!(ticket.user().id(), Some(1));
        assert_eq!(ticket.user().email().as_str(), "ada@analytical.example");
        assert_eq!(
            ticket.user().base().created().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-03-01 09:00:00"
        );
        assert_eq!(titles(&ticket), ["Async Rust", "Macros by Example"]);

        assert!(tickets.find(666, None).unwrap().is_none());
        assert!(tickets.find_by_code("YYZ").unwrap().is_none());
    }

    #[test]
    fn test_find_by_and_find_all() {
        let db = seeded();
        let tickets = TicketMapper::new(Arc::clone(&db));

        let alan = tickets
            .find_by(&fields! { "user_full_name" => "Alan Turing" }, None, &SelectOptions::new())
            .unwrap();
        assert_eq!(alan.len(), 1);
        assert_eq!(titles(&alan[0]), ["Ownership and Borrowing", "Macros by Example"]);

        let nobody = tickets
            .find_by(&fields! { "user_full_name" => "Nobody" }, None, &SelectOptions::new())
            .unwrap();
        assert!(nobody.is_empty());

        let all = tickets.find_all(&SelectOptions::new()).unwrap();
        let ids: Vec<Option<i64>> = all.iter().map(Entity::id).collect();
        assert_eq!(ids, [Some(1), Some(2)]);
    }

    #[test]
    fn test_ticket_without_enrollments() {
        let db = seeded();
        db.execute_script(
            "INSERT INTO tickets (id, user_id, ip_address, code, created_at, updated_at) \
             VALUES (3, 3, '::1', 'TKT-GRACE-0003', '2024-03-12 10:00:00', '2024-03-12 10:00:00')",
        )
        .unwrap();

        let ticket = TicketMapper::new(db).find(3, None).unwrap().expect("ticket 3");
        assert!(ticket.workshops().is_empty());
        assert_eq!(ticket.user().full_name().first_name(), "Grace");
    }

    #[test]
    fn test_insert_aggregate_with_new_user() {
        let db = seeded();
        let tickets = TicketMapper::new(Arc::clone(&db));
        let workshops = WorkshopMapper::new(Arc::clone(&db));

        let chosen = workshops
            .find_all(&SelectOptions::new().order("id desc").unwrap())
            .unwrap()
            .filter(|w| w.title() != "Async Rust");
        assert_eq!(chosen.len(), 2);

        let user = new_user("barbara@mit.example", "Barbara Liskov");
        let draft = Ticket::create(
            Record::new()
                .with("ip_address", "172.16.0.9")
                .with_relations(TicketRelations::new(user).workshops(chosen)),
        )
        .unwrap();
        assert_eq!(draft.id(), None);

        let saved = tickets.save(&draft).unwrap();
        let id = saved.id().expect("ticket id");
        assert!(saved.user().id().is_some());
        assert_eq!(saved.code(), draft.code());

        assert_eq!(count(&db, "users", fields! { "email" => "barbara@mit.example" }), 1);
        assert_eq!(count(&db, "tickets", fields! { "id" => id }), 1);
        assert_eq!(count(&db, "enrollments", fields! { "ticket_id" => id }), 2);

        let reloaded = tickets.find(id, None).unwrap().expect("stored ticket");
        assert_eq!(titles(&reloaded), ["Macros by Example", "Ownership and Borrowing"]);
        assert_eq!(reloaded.user().email().as_str(), "barbara@mit.example");
        assert_eq!(reloaded.ip_address().to_string(), "172.16.0.9");
    }

    #[test]
    fn test_insert_for_existing_user_creates_no_user() {
        let db = seeded();
        let users = UserMapper::new(Arc::clone(&db));
        let tickets = TicketMapper::new(Arc::clone(&db));

        let grace = users
            .find_by_email(&email("grace@navy.example"))
            .unwrap()
            .expect("seeded user");
        let saved = tickets
            .save(&Ticket::create(Record::new().with_relations(TicketRelations::new(grace))).unwrap())
            .unwrap();

        assert_eq!(saved.user().id(), Some(3));
        assert_eq!(count(&db, "users", fields! {}), 3);
        assert_eq!(count(&db, "enrollments", fields! { "ticket_id" => saved.id().unwrap() }), 0);
    }

    #[test]
    fn test_failed_insert_rolls_back_everything() {
        let db = seeded();
        let tickets = TicketMapper::new(Arc::clone(&db));

        let phantom = Workshop::create(Record::new().with("id", 999i64).with("title", "Phantom"))
            .unwrap();
        let user = new_user("edsger@eindhoven.example", "Edsger Dijkstra");
        let draft = Ticket::create(Record::new().with_relations(
            TicketRelations::new(user).workshops([phantom].into_iter().collect()),
        ))
        .unwrap();

        let err = tickets.save(&draft).unwrap_err();
        assert!(matches!(err, MapperError::Persistence { .. }));
        assert!(err.to_string().contains("Unable to create ticket"));
        // SQLITE_CONSTRAINT_FOREIGNKEY
        assert_eq!(err.code(), Some(787));

        assert_eq!(count(&db, "users", fields! { "email" => "edsger@eindhoven.example" }), 0);
        assert_eq!(count(&db, "tickets", fields! {}), 2);
        assert_eq!(count(&db, "enrollments", fields! {}), 4);
        assert!(!db.in_transaction());
    }

    #[test]
    fn test_update_relinks_user_and_keeps_enrollments() {
        let db = seeded();
        let users = UserMapper::new(Arc::clone(&db));
        let tickets = TicketMapper::new(Arc::clone(&db));

        let mut ticket = tickets.find_by_code("TKT-ALAN-0002").unwrap().expect("seeded");
        let grace = users.find_by_email(&email("grace@navy.example")).unwrap().unwrap();
        ticket.set_user(grace);

        let updated = tickets.save(&ticket).unwrap();
        assert_eq!(updated.id(), Some(2));
        assert_eq!(updated.user().email().as_str(), "grace@navy.example");
        assert_eq!(titles(&updated), ["Ownership and Borrowing", "Macros by Example"]);

        let mut ticket = updated;
        ticket.set_user(new_user("barbara@mit.example", "Barbara Liskov"));
        let updated = tickets.save(&ticket).unwrap();
        assert_eq!(updated.user().email().as_str(), "barbara@mit.example");
        assert!(updated.user().id().is_some());
        assert_eq!(count(&db, "users", fields! {}), 4);
    }

    #[test]
    fn test_update_of_missing_ticket_fails() {
        let db = seeded();
        let tickets = TicketMapper::new(Arc::clone(&db));
        let ada = UserMapper::new(Arc::clone(&db)).find(1, None).unwrap().unwrap();

        let ghost = Ticket::create(
            Record::new()
                .with("id", 404i64)
                .with_relations(TicketRelations::new(ada)),
        )
        .unwrap();
        let err = tickets.save(&ghost).unwrap_err();
        assert!(matches!(err, MapperError::Persistence { .. }));
        assert!(err.to_string().contains("Ticket 404 not found"));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let db = seeded();
        let tickets = TicketMapper::new(Arc::clone(&db));

        let ticket = tickets.find(1, None).unwrap().unwrap();
        tickets.delete(&ticket).unwrap();
        tickets.delete(1i64).unwrap();

        assert!(tickets.find(1, None).unwrap().is_none());
        assert_eq!(count(&db, "enrollments", fields! { "ticket_id" => 1i64 }), 0);
        assert_eq!(count(&db, "users", fields! { "id" => 1i64 }), 1);
    }
}

mod user_tests {
    use super::*;

    #[test]
    fn test_find_and_find_by_email() {
        let db = seeded();
        let users = UserMapper::new(db);

        let alan = users.find(2, None).unwrap().expect("user 2");
        assert_eq!(alan.full_name().last_name(), "Turing");
        assert!(!alan.has_password());
        assert!(alan.base().updated_at() > alan.base().created_at());

        assert!(users.find(42, None).unwrap().is_none());
        assert_eq!(
            users.find_by_email(&email("alan@bletchley.example")).unwrap().unwrap().id(),
            Some(2)
        );
        assert!(users.find_by_email(&email("nobody@nowhere.example")).unwrap().is_none());
    }

    #[test]
    fn test_save_insert_then_update() {
        let db = seeded();
        let users = UserMapper::new(Arc::clone(&db));

        let created = users.save(&new_user("barbara@mit.example", "Barbara Liskov")).unwrap();
        let id = created.id().expect("assigned id");
        assert_eq!(id, 4);

        let renamed = users
            .save(&created.with_full_name("Barbara Jane Liskov".parse().unwrap()))
            .unwrap();
        assert_eq!(renamed.id(), Some(id));
        assert_eq!(renamed.full_name().as_str(), "Barbara Jane Liskov");
        assert_eq!(renamed.base().created_at(), created.base().created_at());
        assert_eq!(count(&db, "users", fields! {}), 4);
    }

    #[test]
    fn test_save_without_password_is_rejected_by_store() {
        let db = seeded();
        let users = UserMapper::new(db);

        let user = User::create(
            Record::new()
                .with("email", "nopass@example.org")
                .with("full_name", "No Password")
                .with("phone", "555 123 456"),
        )
        .unwrap();
        let err = users.save(&user).unwrap_err();
        assert!(matches!(err, MapperError::Persistence { .. }));
        // SQLITE_CONSTRAINT_NOTNULL
        assert_eq!(err.code(), Some(1299));
    }

    #[test]
    fn test_find_or_create() {
        let db = seeded();
        let users = UserMapper::new(Arc::clone(&db));

        let existing = User::create(
            Record::new()
                .with("email", "ada@analytical.example")
                .with("full_name", "Ada Lovelace")
                .with("phone", "+44 20 7946 0101"),
        )
        .unwrap();
        assert_eq!(users.find_or_create(&existing).unwrap().id(), Some(1));

        let fresh = users
            .find_or_create(&new_user("barbara@mit.example", "Barbara Liskov"))
            .unwrap();
        assert_eq!(fresh.id(), Some(4));
        assert_eq!(count(&db, "users", fields! {}), 4);
    }

    #[test]
    fn test_find_per_workshop() {
        let db = seeded();
        let users = UserMapper::new(Arc::clone(&db));

        let macros = users.find_per_workshop(3i64).unwrap();
        let names: Vec<&str> = macros.iter().map(|u| u.full_name().as_str()).collect();
        assert_eq!(names, ["Ada Lovelace", "Alan Turing"]);

        let workshop = WorkshopMapper::new(db).find(1, None).unwrap().unwrap();
        assert_eq!(users.find_per_workshop(&workshop).unwrap().len(), 1);
        assert!(users.find_per_workshop(999i64).unwrap().is_empty());
    }

    #[test]
    fn test_authenticate() {
        let db = seeded();
        let users = UserMapper::new(db);
        users.save(&new_user("barbara@mit.example", "Barbara Liskov")).unwrap();

        let user = users
            .authenticate(&email("barbara@mit.example"), "hunter22")
            .unwrap();
        assert_eq!(user.full_name().as_str(), "Barbara Liskov");
        assert!(!user.has_password());

        let wrong_password = users
            .authenticate(&email("barbara@mit.example"), "hunter2")
            .unwrap_err();
        let unknown_user = users
            .authenticate(&email("mallory@evil.example"), "hunter22")
            .unwrap_err();
        assert!(matches!(wrong_password, MapperError::AuthenticationFailed(_)));
        assert!(matches!(unknown_user, MapperError::AuthenticationFailed(_)));
        assert_eq!(
            wrong_password.to_string(),
            "Authentication failed for user 'barbara@mit.example'"
        );

        // seeded placeholder hashes never verify
        assert!(users.authenticate(&email("ada@analytical.example"), "!").is_err());
    }
}

mod workshop_tests {
    use super::*;

    #[test]
    fn test_find_per_user() {
        let db = seeded();
        let workshops = WorkshopMapper::new(Arc::clone(&db));

        let ada = workshops.find_per_user(1i64).unwrap();
        let names: Vec<&str> = ada.iter().map(Workshop::title).collect();
        assert_eq!(names, ["Async Rust", "Macros by Example"]);

        let grace = UserMapper::new(db).find(3, None).unwrap().unwrap();
        assert!(workshops.find_per_user(&grace).unwrap().is_empty());
    }

    #[test]
    fn test_generic_mapper_over_same_table() {
        let db = seeded();
        let generic: Mapper<Workshop> = Mapper::new(Arc::clone(&db), "workshops");

        let page = generic
            .find_all(&SelectOptions::new().order("title asc").unwrap().limit(2))
            .unwrap();
        let names: Vec<&str> = page.iter().map(Workshop::title).collect();
        assert_eq!(names, ["Async Rust", "Macros by Example"]);
        assert_eq!(page.item_type(), "Workshop");
    }
}

mod fail_soft_tests {
    use super::*;

    fn empty() -> Arc<SqliteDatabase> {
        Arc::new(SqliteDatabase::open_in_memory().unwrap())
    }

    #[test]
    fn test_collection_reads_return_empty_on_store_failure() {
        let db = empty();

        assert!(UserMapper::new(Arc::clone(&db))
            .find_all(&SelectOptions::new())
            .unwrap()
            .is_empty());
        assert!(UserMapper::new(Arc::clone(&db))
            .find_per_workshop(1i64)
            .unwrap()
            .is_empty());
        assert!(WorkshopMapper::new(Arc::clone(&db))
            .find_per_user(1i64)
            .unwrap()
            .is_empty());
        assert!(TicketMapper::new(Arc::clone(&db))
            .find_all(&SelectOptions::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_single_reads_and_writes_fail_hard() {
        let db = empty();
        let users = UserMapper::new(Arc::clone(&db));

        assert!(matches!(users.find(1, None), Err(MapperError::Persistence { .. })));
        assert!(TicketMapper::new(Arc::clone(&db)).find(1, None).is_err());
        assert!(users.save(&new_user("a@b.example", "Anyone")).is_err());
    }

    #[test]
    fn test_validation_errors_still_propagate() {
        let db = seeded();
        db.execute_script("INSERT INTO users (email, full_name, phone, password, created_at, updated_at) \
                           VALUES ('bad', 'Bad Email', '555 000 111', '!', '2024-01-01 00:00:00', '2024-01-01 00:00:00')")
            .unwrap();

        let err = UserMapper::new(db)
            .find_all(&SelectOptions::new())
            .unwrap_err();
        assert!(matches!(err, MapperError::Validation { .. }));
        assert_eq!(err.field(), Some("email"));
    }
}

mod transaction_tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TransferError {
        InsufficientFunds(i64),
        Store(String),
    }

    impl From<MapperError> for TransferError {
        fn from(err: MapperError) -> Self {
            TransferError::Store(err.to_string())
        }
    }

    fn accounts() -> SqliteDatabase {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.execute_script(
            "CREATE TABLE accounts (id INTEGER PRIMARY KEY, balance INTEGER NOT NULL);
             INSERT INTO accounts (id, balance) VALUES (1, 100), (2, 0);",
        )
        .unwrap();
        db
    }

    fn balance(db: &SqliteDatabase, id: i64) -> i64 {
        db.select("accounts", &fields! { "id" => id }, &["balance"], &SelectOptions::new())
            .unwrap()[0]["balance"]
            .as_long()
            .unwrap()
    }

    #[test]
    fn test_error_reaches_caller_unchanged_and_nothing_persists() {
        let db = accounts();

        let result = db.transactional(|db| {
            db.update("accounts", &fields! { "balance" => 0i64 }, &fields! { "id" => 1i64 })?;
            db.update("accounts", &fields! { "balance" => 100i64 }, &fields! { "id" => 2i64 })?;
            Err::<(), _>(TransferError::InsufficientFunds(100))
        });

        assert_eq!(result, Err(TransferError::InsufficientFunds(100)));
        assert_eq!(balance(&db, 1), 100);
        assert_eq!(balance(&db, 2), 0);
        assert!(!db.in_transaction());
    }

    #[test]
    fn test_commit_on_success() {
        let db = accounts();

        let moved: std::result::Result<i64, TransferError> = db.transactional(|db| {
            db.update("accounts", &fields! { "balance" => 40i64 }, &fields! { "id" => 1i64 })?;
            db.update("accounts", &fields! { "balance" => 60i64 }, &fields! { "id" => 2i64 })?;
            Ok(60)
        });

        assert_eq!(moved, Ok(60));
        assert_eq!(balance(&db, 1), 40);
        assert_eq!(balance(&db, 2), 60);
    }

    #[test]
    fn test_nested_transactional_is_rejected() {
        let db = accounts();

        let result: Result<()> = db.transactional(|db| {
            db.transactional(|_| Ok::<(), MapperError>(()))?;
            Ok(())
        });
        assert!(matches!(result, Err(MapperError::TransactionError(_))));
        assert!(!db.in_transaction());
    }

    #[test]
    fn test_concurrent_transactions_are_serialized() {
        let db = Arc::new(accounts());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        db.transactional(|db| -> Result<()> {
                            let current = balance(db, 1);
                            db.update(
                                "accounts",
                                &fields! { "balance" => current + 1 },
                                &fields! { "id" => 1i64 },
                            )?;
                            Ok(())
                        })
                        .expect("transaction failed");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(balance(&db, 1), 180);
    }

    #[test]
    fn test_config_from_json() {
        let config = ConnectionConfig::from_json(r#"{"foreign_keys": false, "busy_timeout_ms": 50}"#)
            .unwrap();
        let db = SqliteDatabase::open(&config).unwrap();
        db.execute_script(SCHEMA).unwrap();

        // dangling reference accepted with enforcement off
        db.insert(
            "enrollments",
            &fields! { "ticket_id" => 77i64, "workshop_id" => 88i64 },
        )
        .unwrap();
    }
}
