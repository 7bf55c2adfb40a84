use repokit_expr::schema::RecordField;
use repokit_expr_macros::Record;

#[derive(Record)]
struct Order {
    #[record(name = "order_id")]
    id: uuid::Uuid,
    #[record(name = "customer_email")]
    email: Option<String>,
    #[record(skip)]
    notes: Vec<String>,
}

fn main() {
    assert_eq!(OrderField::Id.name(), "order_id");
    assert_eq!(order::email().name(), "customer_email");
    assert_eq!(OrderField::FIELDS.len(), 2);
}
