/// A problem with the canonical test case the judge runs submissions against.
///
/// Submissions receive `stdin` and must print `expected_output`; the
/// comparison strips all whitespace, so formatting differences do not matter.
#[derive(Debug, Clone, Copy)]
pub struct Problem {
    pub id: &'static str,
    pub title: &'static str,
    pub stdin: &'static str,
    pub expected_output: &'static str,
}

const PROBLEMS: &[Problem] = &[
    Problem {
        id: "question_easy_1",
        title: "Two Sum",
        stdin: "2 7 11 15\n9",
        expected_output: "[0,1]",
    },
    Problem {
        id: "question_easy_2",
        title: "Reverse String",
        stdin: "hello",
        expected_output: "olleh",
    },
    Problem {
        id: "question_medium_1",
        title: "Valid Parentheses",
        stdin: "()[]{}",
        expected_output: "true",
    },
    Problem {
        id: "question_medium_2",
        title: "Maximum Subarray",
        stdin: "-2 1 -3 4 -1 2 1 -5 4",
        expected_output: "6",
    },
    Problem {
        id: "question_hard_1",
        title: "Median of Two Sorted Arrays",
        stdin: "1 3\n2",
        expected_output: "2.0",
    },
    Problem {
        id: "question_hard_2",
        title: "Trapping Rain Water",
        stdin: "0 1 0 2 1 0 1 3 2 1 2 1",
        expected_output: "6",
    },
];

/// Curated problem bank keyed by the question ids generated at duel creation
pub struct ProblemBank;

impl ProblemBank {
    pub fn get(question_id: &str) -> Option<&'static Problem> {
        PROBLEMS.iter().find(|p| p.id == question_id)
    }
}
