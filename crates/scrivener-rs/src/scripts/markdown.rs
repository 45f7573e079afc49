//! Leading-whitespace cleanup for prompt templates written as indented
//! string literals.

/// Strip leading whitespace from every line outside fenced code blocks.
///
/// Fence lines are stripped too, and each one toggles whether the following
/// lines are inside a block. Lines inside a block are left untouched.
pub fn remove_leading_whitespace(markdown: &str) -> String {
    let mut in_block = false;
    markdown
        .split('\n')
        .map(|line| {
            let stripped = line.trim_start();
            if stripped.starts_with("```") {
                in_block = !in_block;
                stripped
            } else if in_block {
                line
            } else {
                stripped
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_is_dedented_code_is_not() {
        let input = "\
    ## Example

    Some prose.
    ```python
    if True:
        print(\"kept\")
    ```
      trailing prose";
        let expected = "\
## Example

Some prose.
```python
    if True:
        print(\"kept\")
```
trailing prose";
        assert_eq!(remove_leading_whitespace(input), expected);
    }

    #[test]
    fn unclosed_fence_protects_the_rest() {
        assert_eq!(remove_leading_whitespace("  a\n```\n  b"), "a\n```\n  b");
    }

    #[test]
    fn line_count_is_preserved() {
        let input = "\n  x\n\n";
        assert_eq!(remove_leading_whitespace(input).split('\n').count(), 4);
    }
}
