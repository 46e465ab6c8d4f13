use formsieve::prelude::*;
use serde_json::{json, Map, Value};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::{NamedTempFile, TempDir};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01\x00\x00\x00\x01";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

fn form(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn upload(name: &str, bytes: &[u8]) -> (NamedTempFile, FileEntry) {
    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(bytes).unwrap();
    let entry = FileEntry::new(name, tmp.path(), bytes.len() as u64);
    (tmp, entry)
}

#[tokio::test]
async fn empty_submission_reports_required_fields() {
    init_tracing();
    let rules = Rules::from_json(json!({"name": "text"})).unwrap();
    let mut handler = Handler::with_sources(Map::new(), None, rules);

    assert!(!handler.execute().await.unwrap());
    assert_eq!(handler.errors().get("name"), Some("name is required"));
    assert!(!handler.succeeds());
}

#[tokio::test]
async fn handlers_are_single_use() {
    let mut handler = Handler::with_sources(form(json!({"a": "1"})), None, Rules::new());
    assert!(handler.execute().await.unwrap());
    assert!(matches!(handler.execute().await, Err(SieveError::State(_))));
}

#[tokio::test]
async fn filters_values_before_validation() {
    init_tracing();
    let rules = Rules::new()
        .with("title", Rule::new(DataType::Text).filters(Filters::new().to_title()))
        .with("year", Rule::new(DataType::Int).filters(Filters::new().to_numeric()))
        .with("price", Rule::new(DataType::Money))
        .with("tags", Rule::new(DataType::Text).filters(Filters::new().to_lower()));
    let data = form(json!({
        "title": "%3Cb%3Ethe%20rust%20book%3C%2Fb%3E",
        "year": "200AD",
        "price": " 19.99 ",
        "tags": ["Rust", "Rust", "  ", "Async"]
    }));
    let mut handler = Handler::with_sources(data, None, rules);

    assert!(handler.execute().await.unwrap());
    let data = handler.data();
    assert_eq!(data.get("title").unwrap(), &json!("The Rust Book"));
    assert_eq!(data.get("year").unwrap(), &json!(200));
    assert_eq!(data.get("price").unwrap(), &json!(19.99));
    assert_eq!(data.get("tags").unwrap(), &json!(["rust", "async"]));
    assert!(matches!(data.get("other"), Err(SieveError::UnknownField(_))));
}

#[tokio::test]
async fn type_errors_use_default_messages() {
    let rules = Rules::from_json(json!({
        "age": "int",
        "dob": "date",
        "start": "date",
        "email": "email",
        "size": {"type": "choice", "options": {"choices": ["s", "m", "l"]}}
    }))
    .unwrap();
    let data = form(json!({
        "age": "a",
        "dob": "2014-13-01",
        "start": "01-01-2014",
        "email": "ada@",
        "size": "xl"
    }));
    let mut handler = Handler::with_sources(data, None, rules);

    assert!(!handler.execute().await.unwrap());
    let errors = handler.errors();
    assert_eq!(errors.get("age"), Some("a is not a valid integer"));
    assert_eq!(errors.get("dob"), Some("2014-13-01 is not a valid date"));
    assert_eq!(
        errors.get("start"),
        Some("01-01-2014 does not match the date format YYYY-MM-DD")
    );
    assert_eq!(errors.get("email"), Some("ada@ is not a valid email address"));
    assert_eq!(errors.get("size"), Some("xl is not an acceptable choice"));
}

#[tokio::test]
async fn required_if_checked_follows_the_filtered_checkbox() {
    let rules = || {
        Rules::new()
            .with("subscribe", Rule::new(DataType::Checkbox).optional())
            .with("topic", Rule::new(DataType::Text).required_if(Conditional::checked("subscribe")))
    };

    let mut handler = Handler::with_sources(form(json!({"subscribe": "true"})), None, rules());
    assert!(!handler.execute().await.unwrap());
    assert_eq!(handler.errors().get("topic"), Some("topic is required"));

    let data = form(json!({"subscribe": "false", "topic": "rust"}));
    let mut handler = Handler::with_sources(data, None, rules());
    assert!(handler.execute().await.unwrap());
    assert_eq!(handler.data().get("subscribe").unwrap(), &json!(false));
    assert_eq!(handler.data().get("topic").unwrap(), &Value::Null);
    assert!(handler.get_resolved_rules()["topic"].dropped);
}

#[tokio::test]
async fn on_demand_only_runs_submitted_and_named_fields() {
    let rules = || {
        Rules::new()
            .with("name", Rule::new(DataType::Text))
            .with("email", Rule::new(DataType::Email))
            .with("age", Rule::new(DataType::PInt))
    };

    let mut handler = Handler::with_sources(form(json!({"email": "ada@example.com"})), None, rules());
    assert!(handler.execute_on_demand(Vec::<String>::new()).await.unwrap());
    assert_eq!(handler.get_resolved_rules().len(), 1);
    assert!(handler.data().get("age").is_err());

    let mut handler = Handler::with_sources(form(json!({"email": "ada@example.com"})), None, rules());
    assert!(!handler.execute_on_demand(["name"]).await.unwrap());
    let errors = handler.errors();
    assert_eq!(errors.get("name"), Some("name is required"));
    assert!(!errors.contains("age"));
}

#[tokio::test]
async fn override_if_replaces_the_filtered_value() {
    let rules = Rules::new().with("country", Rule::new(DataType::Text)).with(
        "state",
        Rule::new(DataType::Text)
            .optional()
            .override_if(Override::new(Condition::NotEquals, "country", "US", "N/A")),
    );

    let mut handler =
        Handler::with_sources(form(json!({"country": "UK", "state": "Kent"})), None, rules.clone());
    assert!(handler.execute().await.unwrap());
    assert_eq!(handler.data().get("state").unwrap(), &json!("N/A"));

    let mut handler = Handler::with_sources(form(json!({"country": "US", "state": "Ohio"})), None, rules);
    assert!(handler.execute().await.unwrap());
    assert_eq!(handler.data().get("state").unwrap(), &json!("Ohio"));
}

#[tokio::test]
async fn placeholders_reach_options_and_hints() {
    let rules = Rules::new()
        .with("password", Rule::new(DataType::Password))
        .with(
            "confirm",
            Rule::new(DataType::Text)
                .options(Options::new().should_match("{password}", Some("passwords differ".into()))),
        )
        .with("attempt", Rule::new(DataType::Int).options(Options::new().max("{limit}")))
        .with("limit", Rule::new(DataType::Int));
    let data = form(json!({
        "password": "s3cret-pass",
        "confirm": "s3cret-past",
        "attempt": "9",
        "limit": "5"
    }));
    let mut handler = Handler::with_sources(data, None, rules);

    assert!(!handler.execute().await.unwrap());
    let errors = handler.errors();
    assert_eq!(errors.get("confirm"), Some("passwords differ"));
    assert_eq!(errors.get("attempt"), Some("attempt should not be greater than 5"));
    assert!(!errors.contains("password"));
}

#[tokio::test]
async fn limits_from_absent_or_invalid_fields_are_skipped() {
    let rules = || {
        Rules::new()
            .with("start", Rule::new(DataType::Date).optional())
            .with("end", Rule::new(DataType::Date).options(Options::new().min("{start}")))
    };

    let mut handler = Handler::with_sources(form(json!({"end": "2024-05-01"})), None, rules());
    assert!(handler.execute().await.unwrap());

    let data = form(json!({"start": "2024-06-01", "end": "2024-05-01"}));
    let mut handler = Handler::with_sources(data, None, rules());
    assert!(!handler.execute().await.unwrap());
    assert_eq!(handler.errors().get("end"), Some("end should not be earlier than 2024-06-01"));

    let data = form(json!({"start": "someday", "end": "2024-05-01"}));
    let mut handler = Handler::with_sources(data, None, rules());
    assert!(!handler.execute().await.unwrap());
    assert!(handler.errors().contains("start"));
    assert!(!handler.errors().contains("end"));
}

#[tokio::test]
async fn unbounded_ranges_from_data_are_field_errors() {
    let rules = Rules::new().with(
        "pick",
        Rule::new(DataType::Range).options(Options::new().range(1, "{max}")),
    );
    let data = form(json!({"max": "inf", "pick": "3"}));
    let mut handler = Handler::with_sources(data, None, rules);

    assert!(!handler.execute().await.unwrap());
    assert_eq!(handler.errors().get("pick"), Some("3 is not an acceptable choice"));
}

#[tokio::test]
async fn submitted_braces_survive_in_error_messages() {
    let rules = Rules::new().with("code", Rule::new(DataType::Int));
    let mut handler = Handler::with_sources(form(json!({"code": "{name}{_index}"})), None, rules);

    assert!(!handler.execute().await.unwrap());
    assert_eq!(handler.errors().get("code"), Some("{name}{_index} is not a valid integer"));
}

#[tokio::test]
async fn db_checks_use_the_adapter() {
    init_tracing();
    let adapter = Arc::new(
        InMemoryAdapter::new().seed("users", vec![json!({"email": "ada@example.com", "id": 1})]),
    );
    let rules = || {
        Rules::new()
            .with("email", Rule::new(DataType::Email).db_check(DbCheck::not_exists("users")))
            .with(
                "referrer",
                Rule::new(DataType::PInt)
                    .optional()
                    .db_check(DbCheck::exists("users").field("id").err("unknown referrer {value}")),
            )
    };

    let data = form(json!({"email": "ada@example.com", "referrer": "7"}));
    let mut handler = Handler::with_sources(data, None, rules()).db_adapter(adapter.clone());
    assert!(!handler.execute().await.unwrap());
    let errors = handler.errors();
    assert_eq!(errors.get("email"), Some("ada@example.com already exists"));
    assert_eq!(errors.get("referrer"), Some("unknown referrer 7"));

    let data = form(json!({"email": "grace@example.com", "referrer": "1"}));
    let mut handler = Handler::with_sources(data, None, rules()).db_adapter(adapter);
    assert!(handler.execute().await.unwrap());
}

#[tokio::test]
async fn db_checks_need_an_adapter() {
    let rules = Rules::new().with("email", Rule::new(DataType::Email).db_check(DbCheck::not_exists("users")));
    let mut handler = Handler::with_sources(form(json!({"email": "ada@example.com"})), None, rules)
        .config(HandlerConfig::new());
    assert!(matches!(handler.execute().await, Err(SieveError::Config(_))));
}

#[tokio::test]
async fn db_checks_are_skipped_after_validation_errors() {
    let rules = Rules::new()
        .with("age", Rule::new(DataType::PInt))
        .with("email", Rule::new(DataType::Email).db_check(DbCheck::not_exists("users")));
    let data = form(json!({"age": "-4", "email": "ada@example.com"}));
    let mut handler = Handler::with_sources(data, None, rules);

    assert!(!handler.execute().await.unwrap());
    assert_eq!(handler.errors().len(), 1);
}

#[tokio::test]
async fn checks_stop_at_the_first_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let adapter = Arc::new(InMemoryAdapter::new().seed("users", vec![json!({"email": "ada@example.com"})]));
    let rules = Rules::new().with(
        "email",
        Rule::new(DataType::Email)
            .db_check(DbCheck::not_exists("users"))
            .check_with(move |_ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Err("second check ran".to_string()) })
            }),
    );

    let data = form(json!({"email": "ada@example.com"}));
    let mut handler = Handler::with_sources(data, None, rules).db_adapter(adapter);
    assert!(!handler.execute().await.unwrap());
    assert_eq!(handler.errors().get("email"), Some("ada@example.com already exists"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn list_checks_skip_values_after_a_failure() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let rules = Rules::new().with(
        "emails",
        Rule::new(DataType::Email).check_with(move |ctx| {
            let email = ctx.value.as_str().unwrap_or_default().to_string();
            log.lock().unwrap().push(email.clone());
            Box::pin(async move {
                if email.starts_with("taken") {
                    Err("{value} is taken".to_string())
                } else {
                    Ok(())
                }
            })
        }),
    );

    let data = form(json!({"emails": ["free@example.com", "taken@example.com", "later@example.com"]}));
    let mut handler = Handler::with_sources(data, None, rules);
    assert!(!handler.execute().await.unwrap());
    assert_eq!(handler.errors().get("emails"), Some("taken@example.com is taken"));
    assert_eq!(*seen.lock().unwrap(), vec!["free@example.com", "taken@example.com"]);
}

#[tokio::test]
async fn callback_checks_and_compute_hooks() {
    let rules = Rules::new()
        .with(
            "username",
            Rule::new(DataType::Text)
                .filters(Filters::new().to_lower())
                .check_with(|ctx| {
                    Box::pin(async move {
                        match ctx.value.as_str() {
                            Some("admin") => Err("{value} is reserved".to_string()),
                            _ => Ok(()),
                        }
                    })
                }),
        )
        .with("title", Rule::new(DataType::Text))
        .with(
            "slug",
            Rule::new(DataType::Text).optional().compute(|ctx| {
                Box::pin(async move {
                    let title = ctx.data.get("title").and_then(Value::as_str).unwrap_or_default();
                    Ok(json!(title.to_lowercase().replace(' ', "-")))
                })
            }),
        );

    let data = form(json!({"username": "ADMIN", "title": "Hello World"}));
    let mut handler = Handler::with_sources(data, None, rules.clone());
    assert!(!handler.execute().await.unwrap());
    assert_eq!(handler.errors().get("username"), Some("admin is reserved"));
    assert_eq!(handler.data().get("slug").unwrap(), &Value::Null);

    let data = form(json!({"username": "ada", "title": "Hello World"}));
    let mut handler = Handler::with_sources(data, None, rules);
    assert!(handler.execute().await.unwrap());
    assert_eq!(handler.data().get("slug").unwrap(), &json!("hello-world"));
}

#[tokio::test]
async fn added_fields_are_merged() {
    let rules = Rules::new().with("name", Rule::new(DataType::Text));
    let mut handler = Handler::with_sources(form(json!({"name": "Ada"})), None, rules)
        .add_field("source", "import", None)
        .add_field("count", "3", Some(Rule::new(DataType::PInt)));

    assert!(handler.execute().await.unwrap());
    let data = handler.data();
    assert_eq!(data.get("source").unwrap(), &json!("import"));
    assert_eq!(data.get("count").unwrap(), &json!(3));
}

#[tokio::test]
async fn phone_numbers_are_reformatted() {
    let rules = Rules::new().with(
        "phone",
        Rule::new(DataType::PhoneNumber).options(Options::new().country("GB").format(PhoneFormat::E164)),
    );
    let mut handler = Handler::with_sources(form(json!({"phone": "020 7946 0958"})), None, rules.clone());
    assert!(handler.execute().await.unwrap());
    assert_eq!(handler.data().get("phone").unwrap(), &json!("+442079460958"));

    let mut handler = Handler::with_sources(form(json!({"phone": "12"})), None, rules);
    assert!(!handler.execute().await.unwrap());
    assert_eq!(handler.errors().get("phone"), Some("12 is not a valid phone number"));
}

#[tokio::test]
async fn model_export_expands_dotted_keys() {
    let rules = Rules::new()
        .with("first_name", Rule::new(DataType::Text))
        .with("address.country", Rule::new(DataType::Text).filters(Filters::new().to_upper()))
        .with("password", Rule::new(DataType::Password));
    let data = form(json!({"first_name": "Ada", "address.country": "uk", "password": "an4lytic-engine"}));
    let mut handler = Handler::with_sources(data, None, rules);
    assert!(handler.execute().await.unwrap());

    let nested = handler.model().expand_properties(true).skip(["password"]).export();
    assert_eq!(
        Value::Object(nested),
        json!({"firstName": "Ada", "address": {"country": "UK"}})
    );

    let flat = handler.model().case_style(CaseStyle::Snake).export();
    assert_eq!(flat["address.country"], json!("UK"));
    assert_eq!(flat["first_name"], json!("Ada"));
}

#[tokio::test]
async fn file_rules_need_a_files_source() {
    let rules = Rules::new().with("avatar", Rule::new(DataType::Image));
    let mut handler = Handler::with_sources(Map::new(), None, rules);
    let err = handler.execute().await.unwrap_err();
    assert!(matches!(err, SieveError::MissingFilesSource(field) if field == "avatar"));
}

#[tokio::test]
async fn uploads_are_validated_and_moved() {
    init_tracing();
    let uploads = TempDir::new().unwrap();
    let (_avatar_tmp, avatar) = upload("me.png", PNG);
    let (_notes_tmp, notes) = upload("notes.txt", PNG);

    let mut files = FilesSource::new();
    files.insert("avatar".into(), FileInput::from(avatar));
    let rules = Rules::new().with(
        "avatar",
        Rule::new(DataType::Image).options(Options::new().max("1kb").move_to(uploads.path())),
    );
    let mut handler = Handler::with_sources(Map::new(), Some(files), rules);

    assert!(handler.execute().await.unwrap());
    let avatar = handler.data().get("avatar").unwrap().clone();
    assert_eq!(avatar["ext"], json!("png"));
    assert_eq!(avatar["type"], json!("image/png"));
    let key = avatar["key"].as_str().unwrap();
    assert!(key.ends_with(".png"));
    assert!(uploads.path().join(key).exists());

    let mut files = FilesSource::new();
    files.insert("notes".into(), FileInput::from(notes));
    let rules = Rules::new().with("notes", Rule::new(DataType::Document));
    let mut handler = Handler::with_sources(Map::new(), Some(files), rules);

    assert!(!handler.execute().await.unwrap());
    assert_eq!(
        handler.errors().get("notes"),
        Some("notes.txt is not a valid document file")
    );
}

#[tokio::test]
async fn multiple_uploads_on_a_single_file_field() {
    let (_a, first) = upload("a.png", PNG);
    let (_b, second) = upload("b.png", PNG);
    let mut files = FilesSource::new();
    files.insert("avatar".into(), FileInput::from(vec![first, second]));

    let rules = Rules::new().with("avatar", Rule::new(DataType::Image));
    let mut handler = Handler::with_sources(Map::new(), Some(files), rules);
    assert!(!handler.execute().await.unwrap());
    assert_eq!(
        handler.errors().get("avatar"),
        Some("avatar does not accept multiple values")
    );
}
