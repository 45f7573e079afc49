//! Prompt templates for the script writer.
//!
//! Templates are written as indented literals and passed through
//! [`remove_leading_whitespace`] so the model sees flush-left markdown while
//! the bundled example scripts keep their indentation.

use scrivener_rs::scripts::remove_leading_whitespace;

/// Example answer for "calculate the first 100 fibonacci numbers".
pub const FIBONACCI_EXAMPLE_SCRIPT: &str = include_str!("../assets/fibonacci.py");
/// The same script before documentation was added.
pub const FIBONACCI_BASIC_SCRIPT: &str = include_str!("../assets/fibonacci_basic.py");
pub const FIBONACCI_EXAMPLE_TEST_SCRIPT: &str = include_str!("../assets/test_fibonacci.py");

/// Label shown before reading a new script request.
pub const NEW_SCRIPT_LABEL: &str = "I want you to implement a python script that...";

/// User prompt recorded in files produced by documenting an existing script.
pub const AUTO_DOCUMENT_PROMPT: &str = "Auto-comment-and-document";

/// Wrap a request for a new script in the planning template.
pub fn new_script_prompt(request: &str) -> String {
    let prompt = format!(
        "I want you to implement a python script that {request}
        Can you respond with the full script, and if you want to explain things, explain
        with comments in the code? I already have numpy, matplotlib, tensorflow, keras, and jupyter installed and running.
        Please format your response in markdown, and right before the script, with a header of a script filename.
        Also, for each function definition, please add a docstring description in reStructuredText format.
        Please include parameter and return types in the function definitions.
        Please include a docstring for classes.
        Before writing the script, describe your plan for the script, and what you are trying to accomplish.
        Be sure to describe your plan for the main() function, which should provide an example of how to use the script.
        For example, if you were writing a script to calculate the first 100 fibonacci numbers,
        you would write something like this:

        # fibonacci.py

        ### Plan

        In this script, we will calculate the first 100 fibonacci numbers, however, if we have already calculated
        a fibonacci number, we will not recalculate it, we will just use the previously calculated value.
        This is important, to ensure that we do not waste time recalculating the same fibonacci numbers over and over.

        ```python\n{FIBONACCI_EXAMPLE_SCRIPT}```
        "
    );
    remove_leading_whitespace(&prompt)
}

/// Ask for a description (and optionally comments and docstrings) of an
/// existing script named `file_name`.
pub fn improve_script_prompt(
    file_name: &str,
    content: &str,
    comment_lines: bool,
    add_docstrings: bool,
) -> String {
    let mut prompt =
        String::from("Can you please read over this script, and then write a description for it?");
    if comment_lines {
        prompt.push_str(" And could you please add a comment for each non-trivial line of code.");
    }
    if add_docstrings {
        prompt.push_str(&format!(
            "
            Also, for each function, please add a docstring description in reStructuredText format.
            Please include parameter and return types in the function definitions.
            Please include a docstring for classes as well.

            For example, if I gave you this basic script as input:

            # fibonacci.py
            \n```python\n{FIBONACCI_BASIC_SCRIPT}\n```\n
            I would expect this output:

            # fibonacci.py
            \n```python\n{FIBONACCI_EXAMPLE_SCRIPT}\n```\n
            Ok, that's the example, now, here is the real script, please improve it as described above:
            "
        ));
    }
    prompt.push_str(&format!("\n# {file_name}\n```python\n{content}\n```\n"));
    remove_leading_whitespace(&prompt)
}

/// Follow-up asking for unit tests. `test_files` is the sentence naming the
/// expected test files. `documenting` selects the example shown: the
/// bundled fibonacci script when the conversation did not produce it.
pub fn write_tests_prompt(test_files: &str, documenting: bool) -> String {
    let mut prompt = format!(
        "
        Can you please write unit tests for each of the functions above?
        Please use the unittest module, and write the tests in a new script.
        The first argument to an assertion should be the expected value, and the second argument should be the actual value.
        For example: `self.assertEqual(2, addNumbers(1,1))`
        Try to cover as many edge cases as you can think of.
        {test_files}
        "
    );
    if documenting {
        prompt.push_str(&format!(
            "
            As an example, for this script:

            # fibonacci.py

            ```python\n{FIBONACCI_EXAMPLE_SCRIPT}\n```
            Your output could look like this:
            "
        ));
    } else {
        prompt.push_str(
            "
            As an example, for the script earlier, fibonacci.py, your output could look like this:
            ",
        );
    }
    prompt.push_str(&format!(
        "
        # test_fibonacci.py

        ### Plan

        #### fibonacci

        ##### Edge Cases

        - fibonacci(0) should return [1]
        - fibonacci(1) should return [1, 1]

        ##### General Cases

        - We will test the FibonacciMemoizer.fibonacci function by testing the first few numbers in the sequence.

        ```python\n{FIBONACCI_EXAMPLE_TEST_SCRIPT}\n```
        "
    ));
    remove_leading_whitespace(&prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_script_prompt_is_flush_left_but_keeps_example_indentation() {
        let prompt = new_script_prompt("plots a sine wave");
        assert!(prompt.starts_with("I want you to implement a python script that plots a sine wave\n"));
        assert!(prompt.contains("\n# fibonacci.py\n"));
        assert!(prompt.contains("\n```python\n"));
        assert!(prompt.contains(FIBONACCI_EXAMPLE_SCRIPT));
        for line in prompt.lines().take(10) {
            assert_eq!(line, line.trim_start());
        }
    }

    #[test]
    fn improve_prompt_flags() {
        let plain = improve_script_prompt("report.py", "print(1)", false, false);
        assert!(plain.starts_with("Can you please read over this script"));
        assert!(!plain.contains("non-trivial line"));
        assert!(!plain.contains("reStructuredText"));
        assert!(plain.ends_with("# report.py\n```python\nprint(1)\n```\n"));

        let full = improve_script_prompt("report.py", "print(1)", true, true);
        assert!(full.contains("non-trivial line"));
        assert!(full.contains("reStructuredText"));
        assert!(full.contains(FIBONACCI_BASIC_SCRIPT));
        assert!(full.contains("\nOk, that's the example"));
    }

    #[test]
    fn tests_prompt_names_files_and_picks_example() {
        let sentence = "Please make 1 test file and call it test_stats";
        let after_new = write_tests_prompt(sentence, false);
        assert!(after_new.contains(&format!("\n{sentence}\n")));
        assert!(after_new.contains("for the script earlier, fibonacci.py"));
        assert!(after_new.contains(FIBONACCI_EXAMPLE_TEST_SCRIPT));

        let after_doc = write_tests_prompt(sentence, true);
        assert!(after_doc.contains("As an example, for this script:"));
        assert!(after_doc.contains(FIBONACCI_EXAMPLE_SCRIPT));
    }
}
