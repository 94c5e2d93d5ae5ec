use litestmt::{Connection, Finalizer, Resetter, TransactionMode, Value, ValueRows};

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let db = Connection::open_in_memory()?;
	db.execute_batch("create table inventory(sku text primary key, qty integer not null)")?;

	let mut insert = db.prepare("insert into inventory(sku, qty) values (?, ?)")?;
	let mut rows = ValueRows::new(
		[("A100", 8_i64), ("B205", 14), ("C330", 3)]
			.map(|(sku, qty)| vec![Value::from(sku), Value::Integer(qty)]),
	);
	let inserted = insert.execute_many(&mut rows, TransactionMode::Immediate)?;
	println!("inserted {inserted} rows");

	let mut lookup = db.prepare("select qty from inventory where sku = ?")?;
	for sku in ["A100", "C330"] {
		let mut guard = Resetter::new(&mut lookup);
		guard.bind_text(1, sku)?;
		if guard.next()? {
			println!("{sku}: {}", guard.value(0)?.as_i64());
		}
	}

	let mut total = db.prepare("select sum(qty) from inventory")?;
	let row = Finalizer::new(&mut total)?;
	println!("total: {}", row.value(0)?.as_i64());

	Ok(())
}
