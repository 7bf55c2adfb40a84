use repokit_expr_macros::Record;

#[derive(Record)]
pub struct Customer {
    pub company: String,
    pub nickname: Option<String>,
    pub age: u32,
}

fn main() {
    let by_company = customer::company().contains("ACME");
    let by_nickname = customer::nickname().ends_with("y");
    let adults = customer::age().ge(18);
    let _ = by_company.or(by_nickname).and(adults);
}
