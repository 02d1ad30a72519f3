/// A listed company and its ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Company {
    /// Display name.
    pub name: &'static str,
    /// Exchange ticker.
    pub ticker: &'static str,
}

const UNIVERSE: &[Company] = &[
    Company { name: "Amazon", ticker: "AMZN" },
    Company { name: "Apple", ticker: "AAPL" },
    Company { name: "Walgreen", ticker: "WBA" },
    Company { name: "Northrop Grumman", ticker: "NOC" },
    Company { name: "Boeing", ticker: "BA" },
    Company { name: "Lockheed Martin", ticker: "LMT" },
    Company { name: "McDonalds", ticker: "MCD" },
    Company { name: "Intel", ticker: "INTC" },
    Company { name: "IBM", ticker: "IBM" },
    Company { name: "Texas Instruments", ticker: "TXN" },
    Company { name: "MasterCard", ticker: "MA" },
    Company { name: "Microsoft", ticker: "MSFT" },
    Company { name: "General Electrics", ticker: "GE" },
    Company { name: "American Express", ticker: "AXP" },
    Company { name: "Pepsi", ticker: "PEP" },
    Company { name: "Coca Cola", ticker: "KO" },
    Company { name: "Johnson & Johnson", ticker: "JNJ" },
    Company { name: "Toyota", ticker: "TM" },
    Company { name: "Honda", ticker: "HMC" },
    Company { name: "Mitsubishi", ticker: "MSBHY" },
    Company { name: "Sony Group", ticker: "SONY" },
    Company { name: "Exxon", ticker: "XOM" },
    Company { name: "Chevron", ticker: "CVX" },
    Company { name: "Valero Energy", ticker: "VLO" },
    Company { name: "Ford", ticker: "F" },
    Company { name: "Bank of America", ticker: "BAC" },
];

/// Large-cap US and Japanese names spanning tech, defense, energy, autos,
/// consumer staples and finance. Sector spread makes the clusters readable.
pub fn default_universe() -> &'static [Company] {
    UNIVERSE
}

impl Company {
    /// Look up a company in the default universe by ticker (case-insensitive).
    pub fn by_ticker(ticker: &str) -> Option<Company> {
        UNIVERSE
            .iter()
            .find(|c| c.ticker.eq_ignore_ascii_case(ticker))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tickers_unique() {
        let tickers: HashSet<_> = default_universe().iter().map(|c| c.ticker).collect();
        assert_eq!(tickers.len(), default_universe().len());
    }

    #[test]
    fn test_lookup_case_insensitive() {
        assert_eq!(Company::by_ticker("xom").map(|c| c.name), Some("Exxon"));
        assert!(Company::by_ticker("NOPE").is_none());
    }
}
