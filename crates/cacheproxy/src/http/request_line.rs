use std::str::FromStr;

#[derive(Debug)]
pub struct RequestLine {
    pub method: String,
    pub uri: String,
    pub version: String,
}

impl RequestLine {
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

impl FromStr for RequestLine {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(anyhow::anyhow!(
                "malformed request line: {:?}",
                s.trim_end()
            ));
        }
        Ok(Self {
            method: fields[0].to_owned(),
            uri: fields[1].to_owned(),
            version: fields[2].to_owned(),
        })
    }
}
