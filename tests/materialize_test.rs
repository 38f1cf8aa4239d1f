#[path = "support/fake_gateway.rs"]
mod fake_gateway;

use fake_gateway::{dev_config, table_data, FakeGateway, FunctionTemplate};
use sapconn::materialize::materialize_table;
use sapconn::{Command, Connection, ConnectorError, RfcType, Value, ValueType};

const USERS: &str = "Z_USER_STATISTICS";

fn user_rows() -> Vec<Vec<Value>> {
    vec![
        vec![
            Value::String("BOBPAGE".to_string()),
            Value::Int32(412),
            Value::UInt8(1),
            Value::Int16(-3),
            Value::Float64(0.25),
            Value::Bytes(vec![0xDE, 0xAD]),
            Value::String("000000042".to_string()),
            Value::String("1234567890".to_string()),
            Value::String("12345678901234567890".to_string()),
        ],
        vec![
            Value::String("JCDENTON".to_string()),
            Value::Int32(7),
            Value::UInt8(0),
            Value::Int16(12),
            Value::Float64(1.5),
            Value::Bytes(vec![0xBE, 0xEF]),
            Value::String("000000001".to_string()),
            Value::String("0000000002".to_string()),
            Value::String("00000000000000000003".to_string()),
        ],
    ]
}

fn user_gateway() -> FakeGateway {
    FakeGateway::new().with_function(
        USERS,
        FunctionTemplate::new().table(
            "USERS",
            table_data(
                &[
                    ("BNAME", RfcType::Char, 12),
                    ("LOGONS", RfcType::Int, 4),
                    ("LOCKED", RfcType::Int1, 1),
                    ("OFFSET", RfcType::Int2, 2),
                    ("RATE", RfcType::Float, 8),
                    ("PWDHASH", RfcType::Byte, 2),
                    ("SHORT_NUM", RfcType::Num, 9),
                    ("LONG_NUM", RfcType::Num, 10),
                    ("HUGE_NUM", RfcType::Num, 20),
                ],
                user_rows(),
            ),
        ),
    )
}

#[test]
fn every_row_is_copied_in_field_order() {
    let gateway = user_gateway();
    let mut conn = Connection::new(&gateway, &dev_config()).unwrap();
    conn.open().unwrap();

    let results = Command::with_connection(USERS, &conn)
        .execute_data_set()
        .unwrap();
    assert_eq!(results.len(), 1);
    let users = results.table("USERS").expect("USERS table");

    let names: Vec<&str> = users.columns().iter().map(|c| c.name()).collect();
    assert_eq!(
        names,
        vec![
            "BNAME",
            "LOGONS",
            "LOCKED",
            "OFFSET",
            "RATE",
            "PWDHASH",
            "SHORT_NUM",
            "LONG_NUM",
            "HUGE_NUM"
        ]
    );
    let types: Vec<ValueType> = users.columns().iter().map(|c| c.value_type()).collect();
    assert_eq!(
        types,
        vec![
            ValueType::String,
            ValueType::Int32,
            ValueType::UInt8,
            ValueType::Int16,
            ValueType::Float64,
            ValueType::Bytes,
            ValueType::Int32,
            ValueType::Int64,
            ValueType::String
        ]
    );

    assert_eq!(users.row_count(), 2);
    let first = &users.rows()[0];
    assert_eq!(first[0], Value::String("BOBPAGE".to_string()));
    assert_eq!(first[1], Value::Int32(412));
    assert_eq!(first[2], Value::UInt8(1));
    assert_eq!(first[3], Value::Int16(-3));
    assert_eq!(first[4], Value::Float64(0.25));
    assert_eq!(first[5], Value::Bytes(vec![0xDE, 0xAD]));
    assert_eq!(first[6], Value::Int32(42));
    assert_eq!(first[7], Value::Int64(1_234_567_890));
    assert_eq!(first[8], Value::String("12345678901234567890".to_string()));

    assert_eq!(
        users.value(1, "long_num"),
        Some(&Value::Int64(2)),
        "column lookup is case insensitive"
    );
}

#[test]
fn materializing_twice_gives_identical_tables() {
    let gateway = user_gateway();
    let mut conn = Connection::new(&gateway, &dev_config()).unwrap();
    conn.open().unwrap();

    let cmd = Command::with_connection(USERS, &conn);
    let first = cmd.execute_data_set().unwrap();
    let second = cmd.execute_data_set().unwrap();
    assert_eq!(first, second);
    assert_eq!(gateway.invocations().len(), 2);
}

#[test]
fn same_handle_materializes_identically_twice() {
    let gateway = user_gateway();
    let mut conn = Connection::new(&gateway, &dev_config()).unwrap();
    conn.open().unwrap();

    let mut tables = Command::with_connection(USERS, &conn)
        .execute_rfc_tables()
        .unwrap();
    let (name, handle) = &mut tables[0];
    let first = materialize_table(name.as_str(), &mut *handle).unwrap();
    let second = materialize_table(name.as_str(), &mut *handle).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.row_count(), 2);
    assert_eq!(gateway.invocations().len(), 1);
}

#[test]
fn unreadable_cell_aborts_the_table() {
    let gateway = user_gateway();
    gateway.set_fail_cell(1, 4);
    let mut conn = Connection::new(&gateway, &dev_config()).unwrap();
    conn.open().unwrap();

    match Command::with_connection(USERS, &conn).execute_data_set() {
        Err(ConnectorError::RowExtraction {
            table, column, row, ..
        }) => {
            assert_eq!(table, "USERS");
            assert_eq!(column, "RATE");
            assert_eq!(row, 1);
        }
        other => panic!("expected a row extraction error, got {:?}", other),
    }
}

#[test]
fn tables_keep_their_declaration_order() {
    let gateway = FakeGateway::new().with_function(
        "Z_TWO_TABLES",
        FunctionTemplate::new()
            .table(
                "HEADERS",
                table_data(
                    &[("ID", RfcType::Int, 4)],
                    vec![vec![Value::Int32(1)], vec![Value::Int32(2)]],
                ),
            )
            .table("ITEMS", table_data(&[("ID", RfcType::Int, 4)], Vec::new())),
    );
    let mut conn = Connection::new(&gateway, &dev_config()).unwrap();
    conn.open().unwrap();

    let results = Command::with_connection("Z_TWO_TABLES", &conn)
        .execute_data_set()
        .unwrap();
    assert_eq!(results.names().collect::<Vec<_>>(), vec!["HEADERS", "ITEMS"]);
    assert_eq!(results.tables()[0].row_count(), 2);
    let items = results.table("ITEMS").unwrap();
    assert_eq!(items.row_count(), 0);
    assert_eq!(items.column_count(), 1);
}

#[test]
fn unrecognized_metadata_format_yields_no_tables() {
    let gateway = FakeGateway::new().with_function(
        "Z_DRIFTED",
        FunctionTemplate::new()
            .table(
                "RESULTS",
                table_data(&[("ID", RfcType::Int, 4)], vec![vec![Value::Int32(1)]]),
            )
            .metadata("FUNCTION Z_DRIFTED\nTABLE-PARAMETER RESULTS (TABLE)\n"),
    );
    let mut conn = Connection::new(&gateway, &dev_config()).unwrap();
    conn.open().unwrap();

    let results = Command::with_connection("Z_DRIFTED", &conn)
        .execute_data_set()
        .unwrap();
    assert!(results.is_empty());
}
