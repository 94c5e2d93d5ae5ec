use litestmt::{
	BatchSource, Connection, Error, ErrorDetail, OpenOptions, Statement, TransactionMode, Value,
	ValueRows,
};

fn count_rows(db: &Connection) -> i64 {
	let mut stmt = db.prepare("select count(*) from t").expect("prepare count");
	assert!(stmt.next().expect("count row"));
	stmt.value(0).expect("count value").as_i64()
}

fn seeded_db() -> Connection {
	let db = Connection::open_in_memory().expect("open memory database");
	db.execute_batch("create table t(a integer not null)").expect("create table");
	db
}

/// Yields `total` records and fails while binding record number `fail_at`.
struct FailingSource {
	next: i64,
	total: i64,
	fail_at: i64,
}

impl BatchSource for FailingSource {
	fn has_next(&mut self) -> bool {
		self.next < self.total
	}

	fn bind_next(&mut self, stmt: &mut Statement<'_>) -> litestmt::Result<()> {
		self.next += 1;
		if self.next == self.fail_at {
			return Err(Error::Bind(ErrorDetail::Message(format!("record {} is corrupt", self.next))));
		}
		stmt.bind_i64(1, self.next * 10)
	}
}

#[test]
fn three_records_insert_three_rows_and_commit() {
	let db = seeded_db();
	let mut insert = db.prepare("INSERT INTO t(a) VALUES (?)").expect("prepare insert");

	let mut rows = ValueRows::new(vec![
		vec![Value::Integer(1)],
		vec![Value::Integer(2)],
		vec![Value::Integer(3)],
	]);
	let executed = insert.execute_many(&mut rows, TransactionMode::Immediate).expect("run batch");

	assert_eq!(executed, 3);
	assert!(!insert.is_prepared());
	assert!(db.is_autocommit());
	assert_eq!(
		db.query_all("select a from t order by a").expect("query t"),
		vec![vec![Value::Integer(1)], vec![Value::Integer(2)], vec![Value::Integer(3)]]
	);
}

#[test]
fn failing_execute_rolls_back_whole_batch() {
	let db = seeded_db();
	let mut insert = db.prepare("INSERT INTO t(a) VALUES (?)").expect("prepare insert");

	let mut rows =
		ValueRows::new(vec![vec![Value::Integer(1)], vec![Value::Null], vec![Value::Integer(3)]]);
	let err = insert
		.execute_many(&mut rows, TransactionMode::Deferred)
		.expect_err("second record violates NOT NULL");

	assert!(matches!(err, Error::Step(_)));
	assert_eq!(count_rows(&db), 0);
	assert!(db.is_autocommit());
	assert!(insert.is_prepared());
	insert.finalize();
}

#[test]
fn statement_runs_a_new_batch_after_a_failed_one() {
	let db = seeded_db();
	let mut insert = db.prepare("INSERT INTO t(a) VALUES (?)").expect("prepare insert");

	let mut failing = ValueRows::new(vec![vec![Value::Integer(1)], vec![Value::Null]]);
	insert.execute_many(&mut failing, TransactionMode::Deferred).expect_err("NULL record fails");
	assert!(insert.is_prepared());

	let mut rows = ValueRows::new(vec![vec![Value::Integer(7)]]);
	let executed = insert.execute_many(&mut rows, TransactionMode::Deferred).expect("retry batch");

	assert_eq!(executed, 1);
	assert_eq!(db.query_all("select a from t").expect("query t"), vec![vec![Value::Integer(7)]]);
}

#[test]
fn failing_source_rolls_back_whole_batch() {
	let db = seeded_db();
	let mut insert = db.prepare("INSERT INTO t(a) VALUES (?)").expect("prepare insert");

	let mut source = FailingSource { next: 0, total: 3, fail_at: 2 };
	let err = insert
		.execute_many(&mut source, TransactionMode::Exclusive)
		.expect_err("source fails on the second record");

	assert_eq!(err.detail().text(), "record 2 is corrupt");
	assert_eq!(source.next, 2);
	assert_eq!(count_rows(&db), 0);
}

#[test]
fn batch_accepts_trait_objects() {
	let db = seeded_db();
	let mut insert = db.prepare("INSERT INTO t(a) VALUES (?)").expect("prepare insert");

	let mut source = FailingSource { next: 0, total: 4, fail_at: 0 };
	let dyn_source: &mut dyn BatchSource = &mut source;
	let executed = insert.execute_many(dyn_source, TransactionMode::Deferred).expect("run batch");

	assert_eq!(executed, 4);
	assert_eq!(
		db.query_row("select sum(a) from t").expect("sum"),
		Some(vec![Value::Integer(100)])
	);
}

#[test]
fn finalized_statement_cannot_run_a_batch() {
	let db = seeded_db();
	let mut insert = db.prepare("INSERT INTO t(a) VALUES (?)").expect("prepare insert");
	insert.finalize();

	let mut rows = ValueRows::new(vec![vec![Value::Integer(1)]]);
	let err = insert.execute_many(&mut rows, TransactionMode::Deferred).expect_err("not prepared");

	assert!(matches!(err, Error::NotPrepared(_)));
	assert!(db.is_autocommit());
}

#[test]
fn committed_batch_is_visible_to_other_connections() {
	let dir = tempfile::tempdir().expect("create temp dir");
	let path = dir.path().join("batch.db");
	let path = path.to_str().expect("utf-8 temp path");

	let writer = Connection::open(path).expect("open writer");
	writer.execute_batch("create table t(a integer not null)").expect("create table");
	let reader = Connection::open_with(path, &OpenOptions::new().read_only(true))
		.expect("open reader");

	let mut insert = writer.prepare("INSERT INTO t(a) VALUES (?)").expect("prepare insert");
	let mut failing = ValueRows::new(vec![vec![Value::Integer(1)], vec![Value::Null]]);
	insert.execute_many(&mut failing, TransactionMode::Immediate).expect_err("batch fails");
	assert_eq!(count_rows(&reader), 0);

	let mut rows = ValueRows::new((1..=5).map(|a| vec![Value::Integer(a)]));
	insert.execute_many(&mut rows, TransactionMode::Immediate).expect("batch succeeds");
	assert_eq!(count_rows(&reader), 5);
}
