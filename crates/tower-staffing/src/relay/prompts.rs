/// Instruction sent alongside a resident-list screenshot.
///
/// The in-game digits run Food, Service, Recreation, Retail, Creative, which is
/// not the order categories are shown elsewhere.
pub const RESIDENT_EXTRACTION_PROMPT: &str = "\
The image is a Tiny Tower screenshot listing residents.
For every resident you can see, read:
1. the full name;
2. the five skill digits to the right of the name, in on-screen order: Food, Service, Recreation, Retail, Creative;
3. the dream job, printed in a highlight colour under the current job (unemployed residents have one too).

Answer with a JSON array and nothing else: no prose, no markdown fences.
Example:
[{\"name\":\"PERRY MITCHELL\",\"skills\":{\"Food\":0,\"Service\":1,\"Recreation\":9,\"Retail\":2,\"Creative\":9},\"fav\":\"MECHANIC\"}]

Include every visible resident. Use null for a digit you cannot read.";
